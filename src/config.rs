//! Configuration types.
//!
//! Everything is read from the environment; see `CoachConfig::from_env`.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::agent::driver::DEFAULT_MAX_TOOL_ROUNDS;
use crate::error::ConfigError;
use crate::goals::model::DEFAULT_USER_ID;
use crate::llm::LlmConfig;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_DB_PATH: &str = "./data/goaler.db";
pub const DEFAULT_USAGE_LOG: &str = "logs/llm_usage.log";
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Coach configuration.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    /// Answer with the offline tone composer instead of the model.
    pub use_mock: bool,
    /// Present unless `use_mock`.
    pub llm: Option<LlmConfig>,
    pub db_path: PathBuf,
    pub usage_log: PathBuf,
    pub user_id: String,
    pub max_tool_rounds: usize,
    /// Directory for the rolling file log, if any.
    pub log_dir: Option<PathBuf>,
    pub report: ReportConfig,
}

/// Where reports go and which usage log they read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub usage_log: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            usage_log: PathBuf::from(DEFAULT_USAGE_LOG),
        }
    }
}

impl ReportConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        Self {
            output_dir: PathBuf::from(
                get("GOALER_REPORTS_DIR").unwrap_or_else(|| DEFAULT_REPORTS_DIR.to_string()),
            ),
            usage_log: PathBuf::from(
                get("GOALER_USAGE_LOG").unwrap_or_else(|| DEFAULT_USAGE_LOG.to_string()),
            ),
        }
    }
}

/// `GOALER_DB_PATH` or the default location.
pub fn db_path_from_env() -> PathBuf {
    std::env::var("GOALER_DB_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl CoachConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let use_mock = get("GOALER_USE_MOCK").is_some_and(|v| is_truthy(&v));

        let llm = if use_mock {
            None
        } else {
            let api_key = get("OPENAI_API_KEY")
                .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;
            Some(LlmConfig {
                api_key: SecretString::from(api_key),
                model: get("GOALER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: get("GOALER_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            })
        };

        let max_tool_rounds = match get("GOALER_MAX_TOOL_ROUNDS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "GOALER_MAX_TOOL_ROUNDS".to_string(),
                        message: format!("expected a positive integer, got '{raw}'"),
                    });
                }
            },
            None => DEFAULT_MAX_TOOL_ROUNDS,
        };

        let report = ReportConfig::from_vars(&var);

        Ok(Self {
            use_mock,
            llm,
            db_path: PathBuf::from(
                get("GOALER_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            ),
            usage_log: report.usage_log.clone(),
            user_id: get("GOALER_USER_ID").unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            max_tool_rounds,
            log_dir: get("GOALER_LOG_DIR").map(PathBuf::from),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<CoachConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoachConfig::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn missing_key_is_fatal_outside_mock() {
        let err = config(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(k) if k == "OPENAI_API_KEY"));

        let err = config(&[("GOALER_USE_MOCK", "false"), ("OPENAI_API_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn mock_mode_needs_no_key() {
        for flag in ["1", "true", "YES"] {
            let cfg = config(&[("GOALER_USE_MOCK", flag)]).unwrap();
            assert!(cfg.use_mock);
            assert!(cfg.llm.is_none());
        }
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        let llm = cfg.llm.unwrap();
        assert_eq!(llm.api_key.expose_secret(), "sk-test");
        assert_eq!(llm.model, DEFAULT_MODEL);
        assert_eq!(llm.base_url, DEFAULT_API_BASE);
        assert_eq!(cfg.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(cfg.user_id, "default_user");
        assert_eq!(cfg.max_tool_rounds, DEFAULT_MAX_TOOL_ROUNDS);
        assert!(cfg.log_dir.is_none());
        assert_eq!(cfg.report, ReportConfig::default());
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("GOALER_USE_MOCK", "on"),
            ("GOALER_DB_PATH", "/tmp/g.db"),
            ("GOALER_USAGE_LOG", "/tmp/usage.log"),
            ("GOALER_REPORTS_DIR", "/tmp/reports"),
            ("GOALER_USER_ID", "user-1"),
            ("GOALER_MAX_TOOL_ROUNDS", "3"),
            ("GOALER_LOG_DIR", "/tmp/logs"),
        ])
        .unwrap();
        assert_eq!(cfg.user_id, "user-1");
        assert_eq!(cfg.max_tool_rounds, 3);
        assert_eq!(cfg.report.usage_log, PathBuf::from("/tmp/usage.log"));
        assert_eq!(cfg.report.output_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(cfg.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn invalid_tool_rounds() {
        let err = config(&[("GOALER_USE_MOCK", "1"), ("GOALER_MAX_TOOL_ROUNDS", "zero")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "GOALER_MAX_TOOL_ROUNDS"));
    }
}
