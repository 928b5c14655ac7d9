//! Pipeline configuration.
//!
//! Configuration is resolved once at process startup and passed into the pipeline. The binary
//! reads the environment; nothing in this crate calls `std::env`.

use crate::constants::{
    DEFAULT_GENERATION_TEMPERATURE, DEFAULT_MAX_TOKENS, DEFAULT_PROMPT_TEMPERATURE,
};
use crate::error::{CoreError, CoreResult};
use crate::generation::ModelSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What a batch run does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Generate synthetic cases, append them to the case book, then process the case book.
    Generate,
    /// Process the existing case book.
    #[serde(alias = "pre_defined", alias = "predefined")]
    PreDefined,
    /// Reduce existing bundles and append their summaries to `summary.txt`.
    #[serde(alias = "rag_preparation")]
    RagPreparation,
}

impl RunMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::PreDefined => "pre-defined",
            Self::RagPreparation => "rag-preparation",
        }
    }

    /// Whether the run extracts and assembles the case book.
    pub const fn processes_cases(self) -> bool {
        matches!(self, Self::Generate | Self::PreDefined)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A disease to generate cases for.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DiseaseSpec {
    pub name: String,
    #[serde(default = "default_num_generation")]
    pub num_generation: u32,
}

fn default_num_generation() -> u32 {
    1
}

/// Batch pipeline configuration file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PipelineConfig {
    pub mode: RunMode,
    #[serde(default)]
    pub cases_file: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub diseases: Vec<DiseaseSpec>,
    #[serde(default)]
    pub fhir_directory: Option<PathBuf>,
    #[serde(default)]
    pub parsed_fhir_dir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the file cannot be read, [`CoreError::Yaml`] if it does not
    /// parse, and [`CoreError::InvalidInput`] if a field the mode needs is missing.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(CoreError::io(path))?;
        Self::parse(&text)
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// As [`PipelineConfig::load`], minus the I/O case.
    pub fn parse(yaml_text: &str) -> CoreResult<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml_text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CoreResult<()> {
        match self.mode {
            RunMode::Generate => {
                self.require(&self.cases_file, "cases_file")?;
                self.require(&self.output_dir, "output_dir")?;
                if self.diseases.is_empty() {
                    return Err(CoreError::InvalidInput(
                        "mode generate needs at least one entry in diseases".into(),
                    ));
                }
                if self.diseases.iter().any(|d| d.name.trim().is_empty()) {
                    return Err(CoreError::InvalidInput(
                        "disease names cannot be empty".into(),
                    ));
                }
            }
            RunMode::PreDefined => {
                self.require(&self.cases_file, "cases_file")?;
                self.require(&self.output_dir, "output_dir")?;
            }
            RunMode::RagPreparation => {
                self.require(&self.fhir_directory, "fhir_directory")?;
                self.require(&self.parsed_fhir_dir, "parsed_fhir_dir")?;
            }
        }
        Ok(())
    }

    fn require(&self, value: &Option<PathBuf>, field: &str) -> CoreResult<()> {
        if value.is_none() {
            return Err(CoreError::InvalidInput(format!(
                "mode {} needs {field}",
                self.mode
            )));
        }
        Ok(())
    }
}

/// Model settings from optional environment values; blank or absent values take the defaults.
///
/// # Errors
///
/// Returns [`CoreError::InvalidInput`] naming the variable when a value does not parse.
pub fn model_settings_from_env_values(
    prompt_temperature: Option<String>,
    generation_temperature: Option<String>,
    max_tokens: Option<String>,
) -> CoreResult<ModelSettings> {
    Ok(ModelSettings {
        prompt_temperature: env_value(
            "PROMPT_TEMPERATURE",
            prompt_temperature,
            DEFAULT_PROMPT_TEMPERATURE,
        )?,
        generation_temperature: env_value(
            "GENERATION_TEMPERATURE",
            generation_temperature,
            DEFAULT_GENERATION_TEMPERATURE,
        )?,
        max_tokens: env_value("PROMPT_MAX_TOKENS", max_tokens, DEFAULT_MAX_TOKENS)?,
    })
}

fn env_value<T: FromStr>(name: &str, value: Option<String>, default: T) -> CoreResult<T> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    value
        .parse()
        .map_err(|_| CoreError::InvalidInput(format!("{name} has an invalid value: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_config() {
        let config = PipelineConfig::parse(
            "mode: generate\n\
             cases_file: cases/generated.yaml\n\
             output_dir: out\n\
             diseases:\n\
             \x20 - name: Type 2 diabetes\n\
             \x20   num_generation: 2\n\
             \x20 - name: Anaemia\n",
        )
        .expect("valid config");

        assert_eq!(config.mode, RunMode::Generate);
        assert_eq!(config.diseases[0].num_generation, 2);
        assert_eq!(config.diseases[1].num_generation, 1);
        assert!(config.mode.processes_cases());
    }

    #[test]
    fn accepts_underscore_mode_spelling() {
        let config = PipelineConfig::parse(
            "mode: rag_preparation\nfhir_directory: out\nparsed_fhir_dir: parsed\n",
        )
        .unwrap();
        assert_eq!(config.mode, RunMode::RagPreparation);
        assert!(!config.mode.processes_cases());
    }

    #[test]
    fn rejects_missing_fields_for_mode() {
        let err = PipelineConfig::parse("mode: pre-defined\ncases_file: cases.yaml\n")
            .expect_err("output_dir missing");
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("output_dir")));

        let err = PipelineConfig::parse("mode: generate\ncases_file: c.yaml\noutput_dir: o\n")
            .expect_err("diseases missing");
        assert!(matches!(err, CoreError::InvalidInput(_)));

        assert!(matches!(
            PipelineConfig::parse("mode: teleport\n"),
            Err(CoreError::Yaml(_))
        ));
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.yaml");
        match PipelineConfig::load(&missing) {
            Err(CoreError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn model_settings_from_env_values_defaults_and_overrides() {
        let defaults = model_settings_from_env_values(None, Some("  ".into()), None).unwrap();
        assert_eq!(defaults, ModelSettings::default());

        let custom =
            model_settings_from_env_values(Some("0.1".into()), None, Some("512".into())).unwrap();
        assert_eq!(custom.prompt_temperature, 0.1);
        assert_eq!(custom.max_tokens, 512);

        let err = model_settings_from_env_values(None, None, Some("lots".into()))
            .expect_err("not a number");
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("PROMPT_MAX_TOKENS")));
    }
}
