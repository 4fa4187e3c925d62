use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

pub const DEFAULT_DECISION_BATCH_SIZE: usize = 1024;

fn default_output_folder() -> PathBuf {
    PathBuf::from("output")
}

fn default_data_folder() -> PathBuf {
    PathBuf::from("data")
}

fn default_decision_batch_size() -> usize {
    DEFAULT_DECISION_BATCH_SIZE
}

/// Represents the overall cleaner configuration read from YAML.
///
/// JSON configs parse as well, since JSON is a subset of YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct CleanerConfig {
    pub options: CleanerOptions,
    pub filters: Vec<ComponentToggle>,
    pub policies: Vec<ComponentToggle>,
    /// Directory relative folders are resolved against; set by the loader to
    /// the config file's parent directory.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Run options. Every key also accepts its spaced legacy spelling
/// (`input file`, `source language`, ...).
#[derive(Deserialize, Debug, Clone)]
pub struct CleanerOptions {
    #[serde(alias = "input file")]
    pub input_file: String,
    #[serde(alias = "align file", default)]
    pub align_file: Option<String>,
    #[serde(alias = "source language")]
    pub source_language: String,
    #[serde(alias = "target language")]
    pub target_language: String,
    #[serde(alias = "output folder", default = "default_output_folder")]
    pub output_folder: PathBuf,
    #[serde(alias = "data folder", default = "default_data_folder")]
    pub data_folder: PathBuf,
    #[serde(alias = "filters folder", default)]
    pub filters_folder: Option<PathBuf>,
    #[serde(alias = "policies folder", default)]
    pub policies_folder: Option<PathBuf>,
    #[serde(default = "default_decision_batch_size")]
    pub decision_batch_size: usize,
}

/// `"on"`/`"off"` as written by hand, or a plain YAML boolean.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ToggleValue {
    Flag(bool),
    Text(String),
}

impl ToggleValue {
    fn is_on(&self) -> bool {
        match self {
            ToggleValue::Flag(flag) => *flag,
            ToggleValue::Text(text) => text.trim().eq_ignore_ascii_case("on"),
        }
    }
}

/// One `[name, "on"|"off"]` entry of the `filters` or `policies` list.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "(String, ToggleValue)")]
pub struct ComponentToggle {
    pub name: String,
    pub enabled: bool,
}

impl From<(String, ToggleValue)> for ComponentToggle {
    fn from((name, value): (String, ToggleValue)) -> Self {
        ComponentToggle {
            name,
            enabled: value.is_on(),
        }
    }
}

impl ComponentToggle {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        ComponentToggle {
            name: name.into(),
            enabled,
        }
    }
}

impl CleanerConfig {
    /// Parses a config document; `base_dir` anchors relative folders.
    pub fn from_yaml_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: CleanerConfig = serde_yaml::from_str(content).map_err(|e| {
            PipelineError::ConfigError(format!("Failed to parse cleaner config YAML: {}", e))
        })?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        for (kind, toggles) in [("filters", &self.filters), ("policies", &self.policies)] {
            for (idx, toggle) in toggles.iter().enumerate() {
                if toggle.name.trim().is_empty() {
                    return Err(PipelineError::ConfigValidationError(format!(
                        "{}: entry at index {} has an empty name",
                        kind, idx
                    )));
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.options.data_folder)
    }

    pub fn input_path(&self) -> PathBuf {
        self.data_dir().join(&self.options.input_file)
    }

    pub fn align_path(&self) -> Option<PathBuf> {
        self.options
            .align_file
            .as_ref()
            .map(|file| self.data_dir().join(file))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.options.output_folder)
    }

    pub fn filters_root(&self) -> Option<PathBuf> {
        self.options.filters_folder.as_deref().map(|p| self.resolve(p))
    }

    pub fn policies_root(&self) -> Option<PathBuf> {
        self.options.policies_folder.as_deref().map(|p| self.resolve(p))
    }

    /// File name of the corpus, used as the suffix of every output file.
    pub fn input_file_name(&self) -> String {
        Path::new(&self.options.input_file)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.options.input_file.clone())
    }

    /// Creates the output folder if it does not exist yet.
    pub fn prepare_output_dir(&self) -> Result<PathBuf> {
        let dir = self.output_dir();
        if !dir.is_dir() {
            info!("Creating output folder {}", dir.display());
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }
}

impl CleanerOptions {
    pub fn validate(&self) -> Result<()> {
        if self.input_file.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "options: input_file cannot be empty".to_string(),
            ));
        }
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "options: source_language and target_language must both be set".to_string(),
            ));
        }
        if let Some(align_file) = &self.align_file {
            if align_file.trim().is_empty() {
                return Err(PipelineError::ConfigValidationError(
                    "options: align_file cannot be empty when given".to_string(),
                ));
            }
        }
        if self.decision_batch_size == 0 {
            return Err(PipelineError::ConfigValidationError(
                "options: decision_batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads and parses the cleaner configuration file.
pub fn load_cleaner_config<P: AsRef<Path>>(config_path: P) -> Result<CleanerConfig> {
    let path_ref = config_path.as_ref();
    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to read cleaner config file '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    let base_dir = path_ref
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    debug!(base_dir = %base_dir.display(), "Resolving config paths");

    CleanerConfig::from_yaml_str(&config_content, base_dir).map_err(|e| match e {
        PipelineError::ConfigError(msg) => PipelineError::ConfigError(format!(
            "{} (in '{}')",
            msg,
            path_ref.display()
        )),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // Helper to create a temporary config file with given content
    fn create_temp_config_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "{}", content).expect("Failed to write to temp file");
        temp_file
    }

    // Helper macro for asserting ConfigValidationError
    macro_rules! assert_config_validation_error {
        ($result:expr, $expected_msg_part:expr) => {
            match $result {
                Err(PipelineError::ConfigValidationError(msg)) => {
                    assert!(
                        msg.contains($expected_msg_part),
                        "Error message '{}' did not contain '{}'",
                        msg,
                        $expected_msg_part
                    );
                }
                Err(other_err) => {
                    panic!(
                        "Expected ConfigValidationError, but got different error: {:?}",
                        other_err
                    );
                }
                Ok(_) => {
                    panic!("Expected error, but got Ok");
                }
            }
        };
    }

    const VALID_YAML: &str = r#"
options:
  input_file: corpus.tsv
  align_file: corpus.align
  source_language: en
  target_language: fr
filters:
  - [NumberOfUnalignedSequences, "on"]
  - [EmptyPhraseFilter, "off"]
  - [LengthRatioFilter, true]
policies:
  - [OneNoPolicy, "on"]
"#;

    #[test]
    fn test_load_valid_config() {
        let temp_file = create_temp_config_file(VALID_YAML);
        let config_result = load_cleaner_config(temp_file.path());
        assert!(
            config_result.is_ok(),
            "Should load valid config: {:?}",
            config_result.err()
        );
        let config = config_result.unwrap();
        assert_eq!(config.filters.len(), 3);
        assert_eq!(
            config.filters[0],
            ComponentToggle::new("NumberOfUnalignedSequences", true)
        );
        assert!(!config.filters[1].enabled);
        assert!(config.filters[2].enabled);
        assert_eq!(config.options.output_folder, PathBuf::from("output"));
        assert_eq!(config.options.decision_batch_size, DEFAULT_DECISION_BATCH_SIZE);
        let parent = temp_file.path().parent().unwrap();
        assert_eq!(config.input_path(), parent.join("data").join("corpus.tsv"));
        assert_eq!(
            config.align_path(),
            Some(parent.join("data").join("corpus.align"))
        );
    }

    #[test]
    fn test_legacy_spaced_keys() {
        let json = r#"{
  "options": {
    "input file": "tm.txt",
    "source language": "en",
    "target language": "de",
    "output folder": "out"
  },
  "filters": [["EmptyPhraseFilter", "on"]],
  "policies": [["OneNoPolicy", "on"]]
}"#;
        let config = CleanerConfig::from_yaml_str(json, "/tmp/base").unwrap();
        assert_eq!(config.options.input_file, "tm.txt");
        assert_eq!(config.options.target_language, "de");
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/base/out"));
        assert!(config.align_path().is_none());
        assert_eq!(config.input_file_name(), "tm.txt");
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_cleaner_config("non_existent_config.yaml");
        match result.err().unwrap() {
            PipelineError::ConfigError(msg) => {
                assert!(msg.contains("Failed to read cleaner config file"));
                assert!(msg.contains("non_existent_config.yaml"));
            }
            _ => panic!("Expected ConfigError for non-existent file"),
        }
    }

    #[test]
    fn test_missing_policies_section() {
        let yaml = r#"
options:
  input_file: corpus.tsv
  source_language: en
  target_language: fr
filters:
  - [EmptyPhraseFilter, "on"]
"#;
        let temp_file = create_temp_config_file(yaml);
        match load_cleaner_config(temp_file.path()).err().unwrap() {
            PipelineError::ConfigError(msg) => {
                assert!(msg.contains("missing field `policies`"), "{}", msg);
            }
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_language_is_config_error() {
        let yaml = r#"
options:
  input_file: corpus.tsv
  source_language: en
filters: []
policies: []
"#;
        let result = CleanerConfig::from_yaml_str(yaml, "");
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_empty_input_file_rejected() {
        let yaml = r#"
options:
  input_file: ""
  source_language: en
  target_language: fr
filters: []
policies: []
"#;
        assert_config_validation_error!(CleanerConfig::from_yaml_str(yaml, ""), "input_file");
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let yaml = r#"
options:
  input_file: corpus.tsv
  source_language: en
  target_language: fr
  decision_batch_size: 0
filters: []
policies: []
"#;
        assert_config_validation_error!(
            CleanerConfig::from_yaml_str(yaml, ""),
            "decision_batch_size"
        );
    }

    #[test]
    fn test_empty_component_name_rejected() {
        let yaml = r#"
options:
  input_file: corpus.tsv
  source_language: en
  target_language: fr
filters:
  - ["", "on"]
policies: []
"#;
        assert_config_validation_error!(CleanerConfig::from_yaml_str(yaml, ""), "empty name");
    }

    #[test]
    fn test_absolute_folders_are_kept() {
        let yaml = r#"
options:
  input_file: corpus.tsv
  source_language: en
  target_language: fr
  data_folder: /srv/tm
  filters_folder: components/filters
filters: []
policies: []
"#;
        let config = CleanerConfig::from_yaml_str(yaml, "/etc/cleaner").unwrap();
        assert_eq!(config.input_path(), PathBuf::from("/srv/tm/corpus.tsv"));
        assert_eq!(
            config.filters_root(),
            Some(PathBuf::from("/etc/cleaner/components/filters"))
        );
        assert!(config.policies_root().is_none());
    }
}
