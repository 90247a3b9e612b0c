use crate::model::{CategoricalRecord, ModelArtifact};
use crate::utils::arrow::column_by_name;
use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use common::{Error, Result};

/// Projects each prepared row onto its categorical columns.
pub fn categorical_records(
    table: &RecordBatch,
    categorical: &[String],
) -> Result<Vec<CategoricalRecord>> {
    let columns = categorical
        .iter()
        .map(|name| {
            column_by_name(table, name)?
                .as_any()
                .downcast_ref::<StringArray>()
                .map(|array| (name.as_str(), array))
                .ok_or_else(|| {
                    Error::SchemaMismatch(format!(
                        "Categorical column '{}' has not been normalized to text",
                        name
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((0..table.num_rows())
        .map(|row| {
            columns
                .iter()
                .filter(|(_, array)| array.is_valid(row))
                .map(|(name, array)| (name.to_string(), array.value(row).to_string()))
                .collect()
        })
        .collect())
}

/// Runs the prepared rows through the model, one prediction per row in order.
pub fn predict(
    table: &RecordBatch,
    categorical: &[String],
    model: &dyn ModelArtifact,
) -> Result<Vec<f64>> {
    let records = categorical_records(table, categorical)?;
    let matrix = model.transform(&records)?;
    let predictions = model.predict(&matrix)?;

    if predictions.len() != table.num_rows() {
        return Err(Error::Artifact(format!(
            "Model returned {} predictions for {} rows",
            predictions.len(),
            table.num_rows()
        )));
    }
    Ok(predictions)
}
