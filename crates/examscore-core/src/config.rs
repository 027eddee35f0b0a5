//! Run configuration.
//!
//! Read from `examscore.toml` (or an explicit path). Every field has a
//! default, so an absent file is the same as an empty one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::loader::LoadOptions;
use crate::model::QuestionType;
use crate::report::SessionLabels;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "examscore.toml";

/// Top-level examscore configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamConfig {
    /// Operator name shown in reports.
    #[serde(default)]
    pub operator: String,
    /// Subject name shown in reports.
    #[serde(default)]
    pub subject: String,
    /// Type for columns with no explicit assignment.
    #[serde(default)]
    pub default_type: QuestionType,
    /// Treat the first column as respondent identifiers.
    #[serde(default)]
    pub respondent_column: bool,
    /// Max columns scored concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for exported files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Export formats: any of `json`, `html`, `xlsx`, or `all`.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    /// Per-question type assignments keyed by column header.
    #[serde(default)]
    pub types: BTreeMap<String, QuestionType>,
}

fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./examscore-results")
}
fn default_formats() -> Vec<String> {
    vec!["json".into(), "html".into(), "xlsx".into()]
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            operator: String::new(),
            subject: String::new(),
            default_type: QuestionType::default(),
            respondent_column: false,
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
            formats: default_formats(),
            types: BTreeMap::new(),
        }
    }
}

impl ExamConfig {
    pub fn labels(&self) -> SessionLabels {
        SessionLabels::new(&self.operator, &self.subject)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            respondent_column: self.respondent_column,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            parallelism: self.parallelism,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Parse a TOML string into an `ExamConfig`.
pub fn parse_config_str(content: &str, source_path: &Path) -> Result<ExamConfig> {
    let mut config: ExamConfig = toml::from_str(content)
        .with_context(|| format!("failed to parse config: {}", source_path.display()))?;
    config.operator = resolve_env_vars(&config.operator);
    config.subject = resolve_env_vars(&config.subject);
    anyhow::ensure!(config.parallelism >= 1, "parallelism must be at least 1");
    Ok(config)
}

/// Load config from an explicit path, or from `examscore.toml` in the
/// current directory if present. Falls back to defaults.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        }
    };

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            parse_config_str(&content, &path)
        }
        None => Ok(ExamConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMSCORE_TEST_VAR", "Bu Sari");
        assert_eq!(resolve_env_vars("${_EXAMSCORE_TEST_VAR}"), "Bu Sari");
        assert_eq!(
            resolve_env_vars("Guru: ${_EXAMSCORE_TEST_VAR}!"),
            "Guru: Bu Sari!"
        );
        assert_eq!(resolve_env_vars("no vars ${unterminated"), "no vars ${unterminated");
        std::env::remove_var("_EXAMSCORE_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ExamConfig::default();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.default_type, QuestionType::Unclassified);
        assert_eq!(config.formats, vec!["json", "html", "xlsx"]);
        assert_eq!(config.labels().subject, "Tidak ada mata pelajaran");
    }

    #[test]
    fn parse_types_table() {
        let toml_str = r#"
operator = "Bu Sari"
subject = "Geografi"
default_type = "PG"
respondent_column = true

[types]
Q2 = "isian"
Q3 = "Esai"
Q4 = "Praktikum"
"#;
        let config = parse_config_str(toml_str, Path::new("examscore.toml")).unwrap();
        assert!(config.respondent_column);
        assert_eq!(config.default_type, QuestionType::MultipleChoice);
        assert_eq!(config.types["Q2"], QuestionType::ShortAnswer);
        assert_eq!(config.types["Q3"], QuestionType::Essay);
        assert_eq!(config.types["Q4"], QuestionType::Custom("Praktikum".into()));
    }

    #[test]
    fn rejects_zero_parallelism() {
        let err = parse_config_str("parallelism = 0", Path::new("x.toml")).unwrap_err();
        assert!(err.to_string().contains("parallelism"));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        assert!(load_config_from(Some(Path::new("no/such/examscore.toml"))).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "subject = \"Kimia\"\nformats = [\"json\"]\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.subject, "Kimia");
        assert_eq!(config.formats, vec!["json"]);
        assert_eq!(config.parallelism, 4);
    }
}
