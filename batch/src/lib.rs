pub mod model;
pub mod processor;
pub mod services;
pub mod storage;
pub mod utils;


use std::sync::Arc;
use common::config::Settings;
use common::Result;
use model::SerializedModel;
use services::{BatchPipeline, RunSummary};
use storage::ParquetStorage;

/// Runs the complete batch scoring pipeline for one partition
pub async fn run_batch_pipeline(config_path: &str, year: i32, month: u32) -> Result<RunSummary> {
    // Load configuration
    let settings = Settings::new(config_path)?;

    let pipeline = BatchPipeline::new(&settings, Arc::new(ParquetStorage::new()))?;

    // Locations are resolved and reported before any I/O happens
    let plan = pipeline.plan(year, month)?;

    let model = SerializedModel::load(&settings.model_path)?;

    pipeline.execute(&plan, &model).await
}
