pub mod assemble;
pub mod predict;
pub mod prepare;

pub use assemble::{PREDICTION_COLUMN, RIDE_ID_COLUMN, assemble, ride_id};
pub use predict::predict;
pub use prepare::{
    CATEGORICAL_COLUMNS, DURATION_COLUMN, DataPreparer, DurationRange, PreparationReport,
};
