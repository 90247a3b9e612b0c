use crate::model::ModelArtifact;
use crate::processor::{self, CATEGORICAL_COLUMNS, DataPreparer, DurationRange};
use crate::storage::{StorageOptions, TableStorage};
use crate::utils::paths::{PathResolver, validate_partition};
use chrono::{DateTime, Utc};
use common::Result;
use common::config::Settings;
use std::sync::Arc;
use tracing::info;

/// Resolved locations for one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub year: i32,
    pub month: u32,
    pub input_uri: String,
    pub output_uri: String,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub plan: RunPlan,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    /// `None` when no row survived preparation.
    pub mean_prediction: Option<f64>,
    pub sum_prediction: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Scores one (year, month) partition: read, prepare, predict, write.
pub struct BatchPipeline {
    paths: PathResolver,
    storage: Arc<dyn TableStorage>,
    options: StorageOptions,
    preparer: DataPreparer,
    categorical: Vec<String>,
}

impl BatchPipeline {
    pub fn new(settings: &Settings, storage: Arc<dyn TableStorage>) -> Result<Self> {
        let paths = PathResolver::new(
            settings.input_file_pattern.as_deref(),
            settings.output_file_pattern.as_deref(),
        )?;
        let range = DurationRange::new(settings.min_duration, settings.max_duration)?;

        Ok(Self {
            paths,
            storage,
            options: StorageOptions::with_endpoint(settings.endpoint_override()),
            preparer: DataPreparer::new(range),
            categorical: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Validates the partition key and resolves its locations. No I/O.
    pub fn plan(&self, year: i32, month: u32) -> Result<RunPlan> {
        validate_partition(year, month)?;

        let plan = RunPlan {
            year,
            month,
            input_uri: self.paths.resolve_input(year, month),
            output_uri: self.paths.resolve_output(year, month),
        };
        info!(
            input_file = %plan.input_uri,
            output_file = %plan.output_uri,
            s3_endpoint_url = ?self.options.endpoint(),
            "Resolved partition {:04}-{:02}",
            year,
            month
        );
        Ok(plan)
    }

    pub async fn execute(&self, plan: &RunPlan, model: &dyn ModelArtifact) -> Result<RunSummary> {
        let started_at = Utc::now();

        let raw = self.storage.read_table(&plan.input_uri, &self.options).await?;

        let (prepared, report) = self.preparer.prepare(&raw, &self.categorical)?;
        let range = self.preparer.range();
        info!(
            rows_read = report.rows_read,
            rows_kept = report.rows_kept,
            rows_dropped = report.rows_dropped(),
            min_duration = range.min,
            max_duration = range.max,
            "Prepared trip records"
        );

        let predictions = processor::predict(&prepared, &self.categorical, model)?;
        let result = processor::assemble(&prepared, &predictions, plan.year, plan.month)?;

        let sum_prediction: f64 = predictions.iter().sum();
        let mean_prediction =
            (!predictions.is_empty()).then(|| sum_prediction / predictions.len() as f64);
        info!(
            predictions = predictions.len(),
            mean_predicted_duration = ?mean_prediction,
            sum_predicted_duration = sum_prediction,
            "Scored partition"
        );

        self.storage
            .write_table(&result, &plan.output_uri, &self.options)
            .await?;

        Ok(RunSummary {
            plan: plan.clone(),
            rows_read: report.rows_read,
            rows_kept: report.rows_kept,
            rows_dropped: report.rows_dropped(),
            mean_prediction,
            sum_prediction,
            started_at,
            finished_at: Utc::now(),
        })
    }

    pub async fn run(&self, year: i32, month: u32, model: &dyn ModelArtifact) -> Result<RunSummary> {
        let plan = self.plan(year, month)?;
        self.execute(&plan, model).await
    }
}
