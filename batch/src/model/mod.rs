pub mod regressor;
pub mod vectorizer;

use common::{Error, Result};
use regressor::RegressorModel;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use vectorizer::{DictVectorizer, DictVectorizerSpec};

pub use vectorizer::FeatureMatrix;

/// Column name to canonical category text for one row.
pub type CategoricalRecord = BTreeMap<String, String>;

pub trait FeatureTransformer: Send + Sync {
    fn n_features(&self) -> usize;
    fn transform(&self, records: &[CategoricalRecord]) -> Result<FeatureMatrix>;
}

pub trait Regressor: Send + Sync {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>>;
}

/// A fitted `(transformer, regressor)` pair, read-only for a run.
pub trait ModelArtifact: Send + Sync {
    fn transform(&self, records: &[CategoricalRecord]) -> Result<FeatureMatrix>;
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>>;
}

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    vectorizer: DictVectorizerSpec,
    regressor: RegressorModel,
}

/// Model artifact decoded from its JSON form.
#[derive(Debug, Clone)]
pub struct SerializedModel {
    transformer: DictVectorizer,
    regressor: RegressorModel,
}

impl SerializedModel {
    pub fn new(transformer: DictVectorizer, regressor: RegressorModel) -> Result<Self> {
        regressor.validate(transformer.n_features())?;
        Ok(Self {
            transformer,
            regressor,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Artifact(format!(
                "Cannot read model artifact {}: {}",
                path.display(),
                e
            ))
        })?;

        let model = Self::from_json(&contents)?;
        info!(
            path = %path.display(),
            n_features = model.transformer.n_features(),
            "Loaded model artifact"
        );
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: ArtifactFile = serde_json::from_str(json)
            .map_err(|e| Error::Artifact(format!("Cannot decode model artifact: {}", e)))?;
        Self::new(DictVectorizer::from_spec(file.vectorizer)?, file.regressor)
    }

    pub fn transformer(&self) -> &DictVectorizer {
        &self.transformer
    }
}

impl ModelArtifact for SerializedModel {
    fn transform(&self, records: &[CategoricalRecord]) -> Result<FeatureMatrix> {
        self.transformer.transform(records)
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.regressor.predict(matrix)
    }
}
