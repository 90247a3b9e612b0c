use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

/// Run configuration, read once at start and handed to the pipeline.
///
/// Keys come from an optional TOML file overlaid by process environment
/// variables of the same name (`INPUT_FILE_PATTERN`, `OUTPUT_FILE_PATTERN`,
/// `S3_ENDPOINT_URL`, `MODEL_PATH`, `MIN_DURATION`, `MAX_DURATION`).
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub input_file_pattern: Option<String>,
    #[serde(default)]
    pub output_file_pattern: Option<String>,
    #[serde(default)]
    pub s3_endpoint_url: Option<String>,
    #[serde(default = "default_model_path")]
    pub model_path: String,
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
}

fn default_model_path() -> String {
    "model.json".to_string()
}

fn default_min_duration() -> f64 {
    1.0
}

fn default_max_duration() -> f64 {
    60.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_file_pattern: None,
            output_file_pattern: None,
            s3_endpoint_url: None,
            model_path: default_model_path(),
            min_duration: default_min_duration(),
            max_duration: default_max_duration(),
        }
    }
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::default());

        Self::from_config(builder.build()?)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;

        debug!(
            input_file_pattern = ?settings.input_file_pattern,
            output_file_pattern = ?settings.output_file_pattern,
            s3_endpoint_url = ?settings.s3_endpoint_url,
            model_path = %settings.model_path,
            "Parsed batch settings"
        );

        Ok(settings)
    }

    /// The storage endpoint override, treating an empty value as unset.
    pub fn endpoint_override(&self) -> Option<&str> {
        self.s3_endpoint_url
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }
}
