//! Server configuration read from the environment at startup

use crate::llm::GeminiConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MODEL: &str = "gemini-exp-1114";
const DEFAULT_ORIGIN: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Everything the process needs, read once at startup.
///
/// | Variable           | Default                    |
/// |--------------------|----------------------------|
/// | `API_KEY` / `GEMINI_API_KEY` | none             |
/// | `PORT`             | `5000`                     |
/// | `GEMINI_MODEL`     | `gemini-exp-1114`          |
/// | `LLM_GATEWAY`      | none                       |
/// | `ALLOWED_ORIGIN`   | `http://localhost:5000`    |
/// | `STATIC_DIR`       | `public`                   |
/// | `HISTORY_PATH`     | `chat_history.json`        |
/// | `PERSONA_PATH`     | none                       |
/// | `HISTORY_WINDOW`   | none (unbounded)           |
/// | `LLM_TIMEOUT_SECS` | `120`                      |
/// | `LLM_MAX_OUTPUT_TOKENS` | none (provider default) |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub allowed_origin: String,
    pub static_dir: PathBuf,
    pub history_path: PathBuf,
    pub persona_path: Option<PathBuf>,
    pub history_window: Option<usize>,
    pub max_output_tokens: Option<u32>,
    pub llm: GeminiConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(get("PORT"), "PORT", "a port number", DEFAULT_PORT)?;
        let timeout_secs = parse_or(
            get("LLM_TIMEOUT_SECS"),
            "LLM_TIMEOUT_SECS",
            "a number of seconds",
            DEFAULT_TIMEOUT_SECS,
        )?;
        let history_window = get("HISTORY_WINDOW")
            .map(|v| parse(&v, "HISTORY_WINDOW", "a positive turn count"))
            .transpose()?
            .filter(|n: &usize| *n > 0);

        let max_output_tokens = get("LLM_MAX_OUTPUT_TOKENS")
            .map(|v| parse(&v, "LLM_MAX_OUTPUT_TOKENS", "a positive token count"))
            .transpose()?
            .filter(|n: &u32| *n > 0);

        let allowed_origin = get("ALLOWED_ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        if !(allowed_origin.starts_with("http://") || allowed_origin.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "ALLOWED_ORIGIN",
                expected: "an http(s) origin",
                value: allowed_origin,
            });
        }

        Ok(Self {
            port,
            allowed_origin: allowed_origin.trim_end_matches('/').to_string(),
            static_dir: get("STATIC_DIR").map_or_else(|| PathBuf::from("public"), PathBuf::from),
            history_path: get("HISTORY_PATH")
                .map_or_else(|| PathBuf::from("chat_history.json"), PathBuf::from),
            persona_path: get("PERSONA_PATH").map(PathBuf::from),
            history_window,
            max_output_tokens,
            llm: GeminiConfig {
                api_key: get("API_KEY").or_else(|| get("GEMINI_API_KEY")),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                gateway: get("LLM_GATEWAY"),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse<T: std::str::FromStr>(
    value: &str,
    var: &'static str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected,
        value: value.to_string(),
    })
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    value.map_or(Ok(default), |v| parse(&v, var, expected))
}
