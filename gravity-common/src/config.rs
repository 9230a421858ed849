//! Runtime configuration for the Gravity relay.
//!
//! The deployment surface is environment variables only: the bot runs
//! behind a webhook host where env is the one configuration channel.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Model used for text-only prompts.
pub const TEXT_MODEL: &str = "llama-3.3-70b-versatile";

/// Vision-capable model used whenever an image is attached.
pub const VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Completion API base URL (OpenAI-compatible surface).
pub const COMPLETION_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Fixed generation parameters, mode-independent.
pub const MAX_OUTPUT_TOKENS: i64 = 2000;
pub const TEMPERATURE: f64 = 0.7;

/// Telegram rejects messages above 4096 characters.
pub const TELEGRAM_MESSAGE_CAP: usize = 4096;

/// Fragment limit for outbound chunks: the platform cap minus headroom
/// for the code-fence repair token.
pub const CHUNK_LIMIT: usize = 4000;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_FORMAT: &str = "pretty";
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 45;

/// Relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telegram bot token (required)
    pub telegram_bot_token: String,
    /// Completion API key (required)
    pub groq_api_key: String,
    /// HTTP bind address
    pub bind_address: String,
    /// HTTP port
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format ("pretty" or "json")
    pub log_format: String,
    /// Optional scratch directory for session snapshots.
    /// When unset, sessions live in memory only.
    pub session_dir: Option<PathBuf>,
    /// Deadline for a single completion call, in seconds
    pub completion_timeout_secs: u64,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        Ok(Self {
            telegram_bot_token: require_env("TELEGRAM_BOT_TOKEN")?,
            groq_api_key: require_env("GROQ_API_KEY")?,
            bind_address: env_or("GRAVITY_BIND_ADDRESS", DEFAULT_BIND_ADDRESS),
            port: parse_env("GRAVITY_PORT", DEFAULT_PORT)?,
            log_level: env_or("GRAVITY_LOG_LEVEL", DEFAULT_LOG_LEVEL),
            log_format: env_or("GRAVITY_LOG_FORMAT", DEFAULT_LOG_FORMAT),
            session_dir: std::env::var("GRAVITY_SESSION_DIR").ok().map(PathBuf::from),
            completion_timeout_secs: parse_env(
                "GRAVITY_COMPLETION_TIMEOUT_SECS",
                DEFAULT_COMPLETION_TIMEOUT_SECS,
            )?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{name} is not set")))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_limit_leaves_headroom_under_the_platform_cap() {
        assert!(CHUNK_LIMIT < TELEGRAM_MESSAGE_CAP);
        // Enough room for an appended closing fence plus a newline
        assert!(TELEGRAM_MESSAGE_CAP - CHUNK_LIMIT >= 4);
    }

    #[test]
    fn model_selection_constants_differ() {
        assert_ne!(TEXT_MODEL, VISION_MODEL);
    }

    #[test]
    fn parse_env_falls_back_to_default_when_unset() {
        let port: u16 = parse_env("GRAVITY_TEST_UNSET_PORT_VAR", 8080).unwrap();
        assert_eq!(port, 8080);
    }
}
