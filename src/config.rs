use std::path::PathBuf;

use url::Url;

use crate::constants::*;

/// Client configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every API path is joined onto
    pub api_url: Url,
    /// Where the CLI keeps session cookies between runs
    pub session_file: Option<PathBuf>,
    pub user_agent: String,
}

impl Config {
    pub fn new(api_url: &str) -> Result<Self, String> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            session_file: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    pub fn from_env() -> Result<Self, String> {
        let raw_url = std::env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_url = parse_api_url(&raw_url)?;

        let session_file = std::env::var(ENV_SESSION_FILE)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let user_agent =
            std::env::var(ENV_USER_AGENT).unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        Ok(Self {
            api_url,
            session_file,
            user_agent,
        })
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }
}

/// Parses and normalises the base URL so that relative joins keep its path.
pub fn parse_api_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{} cannot be empty", ENV_API_URL));
    }

    let mut url =
        Url::parse(trimmed).map_err(|e| format!("Invalid {} '{}': {}", ENV_API_URL, trimmed, e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!(
            "{} must use http or https, got '{}'",
            ENV_API_URL,
            url.scheme()
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
