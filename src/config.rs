//! Runtime configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::llm::DEFAULT_BASE_URL;
use crate::models::FeedbackMode;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
#[error("Invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub gemini_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub llm_timeout: Duration,
    pub store_timeout: Duration,
    pub db_path: Option<PathBuf>,
    pub cors_origins: Vec<String>,
    pub feedback_mode: FeedbackMode,
    pub module_count: usize,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let feedback_mode = match var("COURSE_FORGE_FEEDBACK_MODE") {
            Some(raw) => FeedbackMode::from_str(&raw).ok_or_else(|| ConfigError {
                key: "COURSE_FORGE_FEEDBACK_MODE",
                value: raw.clone(),
                reason: "expected none, light or detailed".to_string(),
            })?,
            None => FeedbackMode::default(),
        };

        let temperature = var("COURSE_FORGE_TEMPERATURE")
            .map(|raw| parse::<f32>("COURSE_FORGE_TEMPERATURE", raw))
            .transpose()?;

        let module_count = var("COURSE_FORGE_MODULE_COUNT")
            .map(|raw| parse::<usize>("COURSE_FORGE_MODULE_COUNT", raw))
            .transpose()?
            .unwrap_or(5);
        if module_count == 0 {
            return Err(ConfigError {
                key: "COURSE_FORGE_MODULE_COUNT",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
            gemini_url: var("COURSE_FORGE_GEMINI_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: var("COURSE_FORGE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            llm_timeout: seconds(
                var("COURSE_FORGE_LLM_TIMEOUT_SECS"),
                "COURSE_FORGE_LLM_TIMEOUT_SECS",
                120,
            )?,
            store_timeout: seconds(
                var("COURSE_FORGE_STORE_TIMEOUT_SECS"),
                "COURSE_FORGE_STORE_TIMEOUT_SECS",
                10,
            )?,
            db_path: var("COURSE_FORGE_DB").map(PathBuf::from),
            cors_origins: var("COURSE_FORGE_CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            feedback_mode,
            module_count,
        })
    }
}

fn parse<T>(key: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError {
        key,
        reason: e.to_string(),
        value: raw,
    })
}

fn seconds(raw: Option<String>, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs = raw.map(|r| parse::<u64>(key, r)).transpose()?.unwrap_or(default);
    if secs == 0 {
        return Err(ConfigError {
            key,
            value: "0".to_string(),
            reason: "timeout must be positive".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
