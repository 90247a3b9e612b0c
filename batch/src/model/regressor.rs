use super::Regressor;
use super::vectorizer::{FeatureMatrix, sparse_value};
use common::{Error, Result};
use serde::Deserialize;

/// Fitted regressor as stored in the artifact, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegressorModel {
    Linear(LinearRegressor),
    RandomForest(ForestRegressor),
}

impl RegressorModel {
    /// Checks the regressor against the transformer's column count.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        match self {
            RegressorModel::Linear(model) => model.validate(n_features),
            RegressorModel::RandomForest(model) => model.validate(n_features),
        }
    }
}

impl Regressor for RegressorModel {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        match self {
            RegressorModel::Linear(model) => model.predict(matrix),
            RegressorModel::RandomForest(model) => model.predict(matrix),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearRegressor {
    pub coef: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearRegressor {
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.coef.len() != n_features {
            return Err(Error::Artifact(format!(
                "Linear model has {} coefficients but the transformer produces {} features",
                self.coef.len(),
                n_features
            )));
        }
        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.validate(matrix.n_features())?;
        Ok(matrix
            .rows()
            .map(|row| {
                self.intercept
                    + row
                        .iter()
                        .map(|(column, value)| self.coef[*column] * value)
                        .sum::<f64>()
            })
            .collect())
    }
}

/// A fitted regression tree in flat array form. Node `i` is a leaf when
/// `children_left[i] == -1`; otherwise rows with
/// `x[feature[i]] <= threshold[i]` descend left.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

const LEAF: i64 = -1;

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<()> {
        let n_nodes = self.children_left.len();
        if n_nodes == 0 {
            return Err(Error::Artifact("Decision tree has no nodes".to_string()));
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|len| *len != n_nodes)
        {
            return Err(Error::Artifact(
                "Decision tree node arrays differ in length".to_string(),
            ));
        }

        for node in 0..n_nodes {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                continue;
            }
            // Children always come after their parent, so descent terminates.
            let in_range = |child: i64| child > node as i64 && (child as usize) < n_nodes;
            if !in_range(left) || !in_range(right) {
                return Err(Error::Artifact(format!(
                    "Decision tree node {} has invalid children ({}, {})",
                    node, left, right
                )));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(Error::Artifact(format!(
                    "Decision tree node {} splits on feature {} outside of {} features",
                    node, feature, n_features
                )));
            }
        }
        Ok(())
    }

    fn predict_row(&self, row: &[(usize, f64)]) -> f64 {
        let mut node = 0;
        while self.children_left[node] != LEAF {
            let x = sparse_value(row, self.feature[node] as usize);
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        self.value[node]
    }
}

/// Averages the output of its trees.
#[derive(Debug, Clone, Deserialize)]
pub struct ForestRegressor {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl ForestRegressor {
    fn validate(&self, n_features: usize) -> Result<()> {
        if self.n_features != n_features {
            return Err(Error::Artifact(format!(
                "Forest was fitted on {} features but the transformer produces {}",
                self.n_features, n_features
            )));
        }
        if self.trees.is_empty() {
            return Err(Error::Artifact("Forest has no trees".to_string()));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(n_features))
    }
}

impl Regressor for ForestRegressor {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.validate(matrix.n_features())?;
        let n_trees = self.trees.len() as f64;
        Ok(matrix
            .rows()
            .map(|row| {
                self.trees
                    .iter()
                    .map(|tree| tree.predict_row(row))
                    .sum::<f64>()
                    / n_trees
            })
            .collect())
    }
}
