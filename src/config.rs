use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use crate::error::Result;

pub const DEFAULT_CLIENT_ID: &str = "1234566.1234567";
pub const DEFAULT_TOKEN_EXCHANGE_URL: &str = "https://identifier-here.lambda-url.us-west-2.on.aws/";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://slack.com/oauth/v2/authorize";
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_CHANNEL_ID: &str = "C0463333N3";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub slack_client_id: String,
    pub token_exchange_url: String,
    pub authorize_url: String,
    pub slack_api_base: String,
    pub channel_id: String,
    pub user_scopes: Vec<String>,
    pub bazel_binary: String,
    pub callback_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub open_browser: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            slack_client_id: DEFAULT_CLIENT_ID.to_string(),
            token_exchange_url: DEFAULT_TOKEN_EXCHANGE_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            slack_api_base: DEFAULT_SLACK_API_BASE.to_string(),
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            user_scopes: vec!["chat:write".to_string(), "files:write".to_string()],
            bazel_binary: "bazel".to_string(),
            callback_timeout_secs: 300,
            request_timeout_secs: 30,
            open_browser: true,
        }
    }
}

impl Config {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Load the config at `path`, falling back to defaults when no path is given
/// or the file does not exist.
pub fn read_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) if path.exists() => path,
        _ => return Ok(Config::default()),
    };
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}
