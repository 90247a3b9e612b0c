use super::{CategoricalRecord, FeatureTransformer};
use common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Sparse numeric rows with a fixed column space.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_features: usize,
    rows: Vec<Vec<(usize, f64)>>,
}

impl FeatureMatrix {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            rows: Vec::new(),
        }
    }

    /// Appends a row of `(column, value)` entries. Entries are kept sorted by
    /// column and must fall inside the column space.
    pub fn push_row(&mut self, mut entries: Vec<(usize, f64)>) -> Result<()> {
        if let Some((column, _)) = entries.iter().find(|(c, _)| *c >= self.n_features) {
            return Err(Error::Artifact(format!(
                "Feature column {} outside of {} columns",
                column, self.n_features
            )));
        }
        entries.sort_by_key(|(column, _)| *column);
        self.rows.push(entries);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn row(&self, index: usize) -> &[(usize, f64)] {
        &self.rows[index]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[(usize, f64)]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Value of a single cell, zero when the row has no entry for it.
    pub fn value(&self, row: usize, column: usize) -> f64 {
        sparse_value(&self.rows[row], column)
    }
}

pub(crate) fn sparse_value(row: &[(usize, f64)], column: usize) -> f64 {
    row.binary_search_by_key(&column, |(c, _)| *c)
        .map(|i| row[i].1)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictVectorizerSpec {
    pub feature_names: Vec<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    "=".to_string()
}

/// One-hot encoder over string-valued records, fitted offline.
///
/// A `(column, value)` pair switches on the feature named
/// `column{separator}value`; pairs missing from the fitted vocabulary
/// contribute nothing.
#[derive(Debug, Clone)]
pub struct DictVectorizer {
    feature_names: Vec<String>,
    separator: String,
    vocabulary: HashMap<String, usize>,
}

impl DictVectorizer {
    pub fn new(feature_names: Vec<String>, separator: &str) -> Result<Self> {
        let mut vocabulary = HashMap::with_capacity(feature_names.len());
        for (index, name) in feature_names.iter().enumerate() {
            if vocabulary.insert(name.clone(), index).is_some() {
                return Err(Error::Artifact(format!(
                    "Duplicate feature name '{}' in vectorizer",
                    name
                )));
            }
        }

        Ok(Self {
            feature_names,
            separator: separator.to_string(),
            vocabulary,
        })
    }

    pub fn from_spec(spec: DictVectorizerSpec) -> Result<Self> {
        Self::new(spec.feature_names, &spec.separator)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn feature_index(&self, column: &str, value: &str) -> Option<usize> {
        let name = format!("{}{}{}", column, self.separator, value);
        self.vocabulary.get(&name).copied()
    }
}

impl FeatureTransformer for DictVectorizer {
    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn transform(&self, records: &[CategoricalRecord]) -> Result<FeatureMatrix> {
        let mut matrix = FeatureMatrix::new(self.n_features());
        for record in records {
            let entries = record
                .iter()
                .filter_map(|(column, value)| self.feature_index(column, value))
                .map(|index| (index, 1.0))
                .collect();
            matrix.push_row(entries)?;
        }
        Ok(matrix)
    }
}
