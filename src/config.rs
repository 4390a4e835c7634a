//! Client configuration from the environment
//!
//! Every setting has a default. Values that fail to parse are logged and
//! replaced by the default, so a bad environment never prevents startup.

use crate::eliza::ConverseMode;
use crate::runtime::DEFAULT_REPLY_DELAY;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://demo.connectrpc.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service origin, without the service path
    pub base_url: String,
    pub converse_mode: ConverseMode,
    /// Pause before a conversational reply is shown
    pub reply_delay: Duration,
    /// Speak HTTP/2 without TLS negotiation (cleartext endpoints)
    pub http2_prior_knowledge: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            converse_mode: ConverseMode::default(),
            reply_delay: DEFAULT_REPLY_DELAY,
            http2_prior_knowledge: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let base_url = lookup("ELIZA_BASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.base_url);

        let converse_mode = lookup("ELIZA_CONVERSE_MODE")
            .and_then(|value| {
                parse_mode(&value).or_else(|| {
                    tracing::warn!(value = %value, "Invalid ELIZA_CONVERSE_MODE, using stream");
                    None
                })
            })
            .unwrap_or(defaults.converse_mode);

        let reply_delay = lookup("ELIZA_REPLY_DELAY_MS")
            .and_then(|value| match value.trim().parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(_) => {
                    tracing::warn!(value = %value, "Invalid ELIZA_REPLY_DELAY_MS, using 1000");
                    None
                }
            })
            .unwrap_or(defaults.reply_delay);

        let http2_prior_knowledge = lookup("ELIZA_H2C").is_some_and(|value| parse_flag(&value));

        Self {
            base_url,
            converse_mode,
            reply_delay,
            http2_prior_knowledge,
        }
    }
}

/// Log file location; `None` when no home directory is known
pub fn log_path_from_env() -> Option<PathBuf> {
    log_path_from_lookup(|key| std::env::var(key).ok())
}

fn log_path_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(path) = lookup("ELIZA_LOG_PATH").filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    lookup("HOME").map(|home| PathBuf::from(home).join(".eliza").join("eliza.log"))
}

fn parse_mode(value: &str) -> Option<ConverseMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "stream" => Some(ConverseMode::Stream),
        "unary" => Some(ConverseMode::Unary),
        _ => None,
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
