use arrow::array::{
    Array,
    ArrayRef,
    TimestampMicrosecondArray,
    TimestampMillisecondArray,
    TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use common::{Error, Result};

pub fn column_by_name<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch.column_by_name(name).ok_or_else(|| {
        Error::SchemaMismatch(format!("Input table has no column named '{}'", name))
    })
}

fn downcast<'a, T: 'static>(array: &'a dyn Array) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::SchemaMismatch(format!(
            "Array of type {:?} could not be downcast",
            array.data_type()
        ))
    })
}

/// Reads a timestamp column of any unit as nanoseconds since the epoch.
///
/// Values stay in UTC; a time zone on the column is ignored because only
/// differences between timestamps are ever taken.
pub fn timestamp_nanos(array: &dyn Array) -> Result<Vec<Option<i128>>> {
    let (raw, nanos_per_tick): (Vec<Option<i64>>, i128) = match array.data_type() {
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Second => (
                downcast::<TimestampSecondArray>(array)?.iter().collect(),
                1_000_000_000,
            ),
            TimeUnit::Millisecond => (
                downcast::<TimestampMillisecondArray>(array)?.iter().collect(),
                1_000_000,
            ),
            TimeUnit::Microsecond => (
                downcast::<TimestampMicrosecondArray>(array)?.iter().collect(),
                1_000,
            ),
            TimeUnit::Nanosecond => (
                downcast::<TimestampNanosecondArray>(array)?.iter().collect(),
                1,
            ),
        },
        other => {
            return Err(Error::SchemaMismatch(format!(
                "Expected a timestamp column, found {:?}",
                other
            )));
        }
    };

    Ok(raw
        .into_iter()
        .map(|value| value.map(|ticks| ticks as i128 * nanos_per_tick))
        .collect())
}
