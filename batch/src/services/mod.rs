pub mod pipeline;

pub use pipeline::{BatchPipeline, RunPlan, RunSummary};
