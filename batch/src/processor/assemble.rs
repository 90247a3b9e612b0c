use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use common::{Error, Result};
use std::sync::Arc;

pub const RIDE_ID_COLUMN: &str = "ride_id";
pub const PREDICTION_COLUMN: &str = "predicted_duration";

pub fn result_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(RIDE_ID_COLUMN, DataType::Utf8, false),
        Field::new(PREDICTION_COLUMN, DataType::Float64, false),
    ]))
}

/// `{year:04}/{month:02}_{row}` where `row` is the post-filter position.
pub fn ride_id(year: i32, month: u32, row: usize) -> String {
    format!("{:04}/{:02}_{}", year, month, row)
}

/// Pairs every prepared row with its prediction, in order.
pub fn assemble(
    prepared: &RecordBatch,
    predictions: &[f64],
    year: i32,
    month: u32,
) -> Result<RecordBatch> {
    if predictions.len() != prepared.num_rows() {
        return Err(Error::SchemaMismatch(format!(
            "Got {} predictions for {} prepared rows",
            predictions.len(),
            prepared.num_rows()
        )));
    }

    let ride_ids: StringArray = (0..predictions.len())
        .map(|row| Some(ride_id(year, month, row)))
        .collect();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(ride_ids),
        Arc::new(Float64Array::from(predictions.to_vec())),
    ];

    Ok(RecordBatch::try_new(result_schema(), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{AsArray, Int64Array};
    use arrow::datatypes::Float64Type;

    fn prepared(rows: usize) -> RecordBatch {
        let schema = Schema::new(vec![Field::new("PULocationID", DataType::Int64, false)]);
        let values: Vec<i64> = (0..rows as i64).map(|v| v * 10).collect();
        RecordBatch::try_new(Arc::new(schema), vec![Arc::new(Int64Array::from(values))]).unwrap()
    }

    #[test]
    fn test_ride_id_format() {
        assert_eq!(ride_id(2022, 2, 0), "2022/02_0");
        assert_eq!(ride_id(2023, 11, 1234), "2023/11_1234");
        assert_eq!(ride_id(999, 1, 5), "0999/01_5");
    }

    #[test]
    fn test_assemble_pairs_rows_with_predictions() {
        let result = assemble(&prepared(3), &[12.5, 7.0, 30.25], 2022, 2).unwrap();

        assert_eq!(result.schema(), result_schema());
        let ids: Vec<&str> = result
            .column(0)
            .as_string::<i32>()
            .iter()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(ids, vec!["2022/02_0", "2022/02_1", "2022/02_2"]);
        let values = result.column(1).as_primitive::<Float64Type>();
        assert_eq!(values.values().to_vec(), vec![12.5, 7.0, 30.25]);
    }

    #[test]
    fn test_assemble_empty_table() {
        let result = assemble(&prepared(0), &[], 2022, 2).unwrap();
        assert_eq!(result.num_rows(), 0);
        assert_eq!(result.num_columns(), 2);
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let err = assemble(&prepared(2), &[1.0], 2022, 2).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }
}
