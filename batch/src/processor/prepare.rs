use crate::utils::arrow::{column_by_name, timestamp_nanos};
use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, Float64Array, StringArray};
use arrow::compute::{cast, filter_record_batch};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, UInt64Type};
use arrow::record_batch::RecordBatch;
use common::{Error, Result};
use std::sync::Arc;

pub const PICKUP_COLUMN: &str = "tpep_pickup_datetime";
pub const DROPOFF_COLUMN: &str = "tpep_dropoff_datetime";
pub const DURATION_COLUMN: &str = "duration";
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["PULocationID", "DOLocationID"];

/// Category text used for missing values.
pub const MISSING_CATEGORY: &str = "-1";

const NANOS_PER_MINUTE: f64 = 60_000_000_000.0;

/// Inclusive trip duration bounds, in minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationRange {
    pub min: f64,
    pub max: f64,
}

impl DurationRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(Error::Config(format!(
                "Invalid duration range [{}, {}]",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, duration: f64) -> bool {
        duration >= self.min && duration <= self.max
    }
}

impl Default for DurationRange {
    fn default() -> Self {
        Self { min: 1.0, max: 60.0 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreparationReport {
    pub rows_read: usize,
    pub rows_kept: usize,
}

impl PreparationReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_kept
    }
}

/// A categorical cell as read from the input, before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CategoryValue<'a> {
    Missing,
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(&'a str),
}

/// Maps any categorical cell to its canonical text.
///
/// Missing values, non-finite floats and blank text become `"-1"`. Floats
/// truncate toward zero (`12.0` -> `"12"`, `-3.7` -> `"-3"`). Text holding
/// a numeric literal is normalized as that number; any other text is kept
/// trimmed. Every output normalizes to itself.
pub fn normalize_category(value: CategoryValue<'_>) -> String {
    match value {
        CategoryValue::Missing => MISSING_CATEGORY.to_string(),
        CategoryValue::Integer(v) => v.to_string(),
        CategoryValue::Unsigned(v) => v.to_string(),
        CategoryValue::Float(v) if v.is_finite() => (v.trunc() as i64).to_string(),
        CategoryValue::Float(_) => MISSING_CATEGORY.to_string(),
        CategoryValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                MISSING_CATEGORY.to_string()
            } else if let Ok(v) = text.parse::<i64>() {
                v.to_string()
            } else if let Ok(v) = text.parse::<f64>() {
                normalize_category(CategoryValue::Float(v))
            } else {
                text.to_string()
            }
        }
    }
}

/// Normalizes a whole categorical column into non-null text.
pub fn normalize_category_column(array: &dyn Array) -> Result<StringArray> {
    let values: Vec<String> = match array.data_type() {
        DataType::Null => vec![MISSING_CATEGORY.to_string(); array.len()],
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let ints = cast(array, &DataType::Int64)?;
            ints.as_primitive::<Int64Type>()
                .iter()
                .map(|v| normalize_category(v.map_or(CategoryValue::Missing, CategoryValue::Integer)))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let ints = cast(array, &DataType::UInt64)?;
            ints.as_primitive::<UInt64Type>()
                .iter()
                .map(|v| normalize_category(v.map_or(CategoryValue::Missing, CategoryValue::Unsigned)))
                .collect()
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let floats = cast(array, &DataType::Float64)?;
            floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| normalize_category(v.map_or(CategoryValue::Missing, CategoryValue::Float)))
                .collect()
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let strings = cast(array, &DataType::Utf8)?;
            strings
                .as_string::<i32>()
                .iter()
                .map(|v| normalize_category(v.map_or(CategoryValue::Missing, CategoryValue::Text)))
                .collect()
        }
        other => {
            return Err(Error::SchemaMismatch(format!(
                "Unsupported categorical column type {:?}",
                other
            )));
        }
    };

    Ok(StringArray::from(values))
}

/// Trip duration in minutes per row, `None` when either timestamp is null.
pub fn compute_durations(table: &RecordBatch) -> Result<Vec<Option<f64>>> {
    let pickup = timestamp_nanos(column_by_name(table, PICKUP_COLUMN)?.as_ref())?;
    let dropoff = timestamp_nanos(column_by_name(table, DROPOFF_COLUMN)?.as_ref())?;

    Ok(pickup
        .into_iter()
        .zip(dropoff)
        .map(|(start, end)| match (start, end) {
            (Some(start), Some(end)) => Some((end - start) as f64 / NANOS_PER_MINUTE),
            _ => None,
        })
        .collect())
}

pub struct DataPreparer {
    range: DurationRange,
}

impl DataPreparer {
    pub fn new(range: DurationRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> DurationRange {
        self.range
    }

    /// Adds `duration`, drops rows outside the duration range and rewrites
    /// the categorical columns as canonical text. Survivors keep input order.
    pub fn prepare(
        &self,
        table: &RecordBatch,
        categorical: &[String],
    ) -> Result<(RecordBatch, PreparationReport)> {
        for name in categorical {
            column_by_name(table, name)?;
        }

        let durations = compute_durations(table)?;
        let mask: BooleanArray = durations
            .iter()
            .map(|d| Some(d.is_some_and(|d| self.range.contains(d))))
            .collect();

        let filtered = filter_record_batch(table, &mask)?;
        let kept_durations: Float64Array = durations
            .into_iter()
            .flatten()
            .filter(|d| self.range.contains(*d))
            .map(Some)
            .collect();

        let mut fields: Vec<Field> = Vec::with_capacity(filtered.num_columns() + 1);
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(filtered.num_columns() + 1);

        let schema = filtered.schema();
        for (field, column) in schema.fields().iter().zip(filtered.columns()) {
            if field.name() == DURATION_COLUMN {
                continue;
            }
            if categorical.iter().any(|name| name == field.name()) {
                fields.push(Field::new(field.name(), DataType::Utf8, false));
                columns.push(Arc::new(normalize_category_column(column.as_ref())?));
            } else {
                fields.push(field.as_ref().clone());
                columns.push(column.clone());
            }
        }
        fields.push(Field::new(DURATION_COLUMN, DataType::Float64, false));
        columns.push(Arc::new(kept_durations));

        let prepared = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        let report = PreparationReport {
            rows_read: table.num_rows(),
            rows_kept: prepared.num_rows(),
        };

        Ok((prepared, report))
    }
}

impl Default for DataPreparer {
    fn default() -> Self {
        Self::new(DurationRange::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, TimestampMicrosecondArray};
    use arrow::datatypes::TimeUnit;

    const MINUTE_US: i64 = 60_000_000;

    fn categorical() -> Vec<String> {
        CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn trips(durations_us: &[i64], pu: Vec<Option<f64>>, do_: Vec<Option<i64>>) -> RecordBatch {
        let start = 1_643_673_600_000_000_i64;
        let pickups: Vec<i64> = durations_us.iter().map(|_| start).collect();
        let dropoffs: Vec<i64> = durations_us.iter().map(|d| start + d).collect();

        let schema = Schema::new(vec![
            Field::new(PICKUP_COLUMN, DataType::Timestamp(TimeUnit::Microsecond, None), true),
            Field::new(DROPOFF_COLUMN, DataType::Timestamp(TimeUnit::Microsecond, None), true),
            Field::new("PULocationID", DataType::Float64, true),
            Field::new("DOLocationID", DataType::Int64, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(TimestampMicrosecondArray::from(pickups)),
                Arc::new(TimestampMicrosecondArray::from(dropoffs)),
                Arc::new(Float64Array::from(pu)),
                Arc::new(Int64Array::from(do_)),
            ],
        )
        .unwrap()
    }

    fn strings(batch: &RecordBatch, name: &str) -> Vec<String> {
        batch
            .column_by_name(name)
            .unwrap()
            .as_string::<i32>()
            .iter()
            .map(|v| v.unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_range_is_boundary_inclusive() {
        let durations = [
            MINUTE_US,                 // exactly 1
            60 * MINUTE_US,            // exactly 60
            999 * MINUTE_US / 1000,    // 0.999
            60_001 * MINUTE_US / 1000, // 60.001
        ];
        let batch = trips(&durations, vec![Some(1.0); 4], vec![Some(2); 4]);

        let (prepared, report) = DataPreparer::default()
            .prepare(&batch, &categorical())
            .unwrap();

        assert_eq!(prepared.num_rows(), 2);
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_dropped(), 2);
        let duration = prepared
            .column_by_name(DURATION_COLUMN)
            .unwrap()
            .as_primitive::<Float64Type>();
        assert_eq!(duration.value(0), 1.0);
        assert_eq!(duration.value(1), 60.0);
    }

    #[test]
    fn test_fractional_seconds_preserved() {
        let batch = trips(&[90_500_000], vec![Some(1.0)], vec![Some(1)]);
        let (prepared, _) = DataPreparer::default()
            .prepare(&batch, &categorical())
            .unwrap();
        let duration = prepared
            .column_by_name(DURATION_COLUMN)
            .unwrap()
            .as_primitive::<Float64Type>();
        assert!((duration.value(0) - 90.5 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_duration_is_dropped() {
        let batch = trips(&[-5 * MINUTE_US, 5 * MINUTE_US], vec![Some(1.0), Some(2.0)], vec![Some(1), Some(2)]);
        let (prepared, _) = DataPreparer::default()
            .prepare(&batch, &categorical())
            .unwrap();
        assert_eq!(strings(&prepared, "PULocationID"), vec!["2"]);
    }

    #[test]
    fn test_survivors_keep_input_order() {
        let batch = trips(
            &[10 * MINUTE_US, 0, 20 * MINUTE_US, 30 * MINUTE_US],
            vec![Some(4.0), Some(5.0), Some(6.0), Some(7.0)],
            vec![Some(40), Some(50), Some(60), Some(70)],
        );
        let (prepared, _) = DataPreparer::default()
            .prepare(&batch, &categorical())
            .unwrap();
        assert_eq!(strings(&prepared, "PULocationID"), vec!["4", "6", "7"]);
        assert_eq!(strings(&prepared, "DOLocationID"), vec!["40", "60", "70"]);
    }

    #[test]
    fn test_missing_category_kept_as_sentinel() {
        let batch = trips(&[10 * MINUTE_US], vec![None], vec![Some(12)]);
        let (prepared, _) = DataPreparer::default()
            .prepare(&batch, &categorical())
            .unwrap();
        assert_eq!(prepared.num_rows(), 1);
        assert_eq!(strings(&prepared, "PULocationID"), vec!["-1"]);
        assert_eq!(strings(&prepared, "DOLocationID"), vec!["12"]);
    }

    #[test]
    fn test_null_timestamp_drops_row() {
        let schema = Schema::new(vec![
            Field::new(PICKUP_COLUMN, DataType::Timestamp(TimeUnit::Microsecond, None), true),
            Field::new(DROPOFF_COLUMN, DataType::Timestamp(TimeUnit::Microsecond, None), true),
            Field::new("PULocationID", DataType::Int64, true),
            Field::new("DOLocationID", DataType::Int64, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(TimestampMicrosecondArray::from(vec![Some(0), None])),
                Arc::new(TimestampMicrosecondArray::from(vec![Some(5 * MINUTE_US), Some(0)])),
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(Int64Array::from(vec![3, 4])),
            ],
        )
        .unwrap();
        let (prepared, report) = DataPreparer::default()
            .prepare(&batch, &categorical())
            .unwrap();
        assert_eq!(report.rows_kept, 1);
        assert_eq!(strings(&prepared, "PULocationID"), vec!["1"]);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let batch = trips(&[MINUTE_US], vec![Some(1.0)], vec![Some(1)]);
        let err = DataPreparer::default()
            .prepare(&batch, &["VendorID".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }

    #[test]
    fn test_normalize_category_values() {
        assert_eq!(normalize_category(CategoryValue::Missing), "-1");
        assert_eq!(normalize_category(CategoryValue::Float(12.0)), "12");
        assert_eq!(normalize_category(CategoryValue::Float(-3.7)), "-3");
        assert_eq!(normalize_category(CategoryValue::Float(f64::NAN)), "-1");
        assert_eq!(normalize_category(CategoryValue::Integer(265)), "265");
        assert_eq!(normalize_category(CategoryValue::Unsigned(7)), "7");
        assert_eq!(normalize_category(CategoryValue::Text(" 012 ")), "12");
        assert_eq!(normalize_category(CategoryValue::Text("43.0")), "43");
        assert_eq!(normalize_category(CategoryValue::Text("")), "-1");
        assert_eq!(normalize_category(CategoryValue::Text("JFK")), "JFK");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            CategoryValue::Missing,
            CategoryValue::Float(12.0),
            CategoryValue::Float(f64::INFINITY),
            CategoryValue::Integer(-1),
            CategoryValue::Text("7.9"),
            CategoryValue::Text(" Newark "),
        ];
        for input in inputs {
            let once = normalize_category(input);
            let twice = normalize_category(CategoryValue::Text(&once));
            assert_eq!(once, twice);
        }

        let column = Float64Array::from(vec![Some(12.0), None, Some(1.5)]);
        let once = normalize_category_column(&column).unwrap();
        let twice = normalize_category_column(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_invalid_duration_range() {
        assert!(DurationRange::new(60.0, 1.0).is_err());
        assert!(DurationRange::new(f64::NAN, 1.0).is_err());
        assert!(DurationRange::new(1.0, 60.0).is_ok());
    }
}
