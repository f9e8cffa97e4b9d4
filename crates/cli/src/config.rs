use anyhow::{Context as AnyhowContext, Result};
use std::fmt;
use std::path::PathBuf;

pub const API_KEY_ENV: &str = "STREAK_API_KEY";
pub const PIPELINE_KEY_ENV: &str = "STREAK_PIPELINE_KEY";
pub const BASE_URL_ENV: &str = "STREAK_BASE_URL";
pub const SITE_DIR_ENV: &str = "AMPLIFY_SITE_DIR";

pub const DEFAULT_BASE_URL: &str = "https://api.streak.com/api/v1";
pub const DEFAULT_PIPELINE_KEY: &str =
    "agxzfm1haWxmb29nYWVyNQsSDE9yZ2FuaXphdGlvbiIOZm9yYXRyYXZlbC5jb20MCxIIV29ya2Zsb3cYgIDFtcWIugoM";
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Runtime settings, resolved once at startup and passed down explicitly.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub pipeline_key: String,
    pub base_url: String,
    pub page_size: usize,
    /// Directory holding `data.js` and `index.html`.
    pub site_dir: PathBuf,
    /// Commit and push after writing.
    pub publish: bool,
}

impl Config {
    pub fn from_env(publish: bool) -> Result<Self> {
        Self::from_lookup(publish, |name| std::env::var(name).ok())
    }

    pub fn from_lookup(publish: bool, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = non_empty(API_KEY_ENV)
            .with_context(|| format!("{API_KEY_ENV} is not set"))?
            .trim()
            .to_string();

        Ok(Self {
            api_key,
            pipeline_key: non_empty(PIPELINE_KEY_ENV)
                .unwrap_or_else(|| DEFAULT_PIPELINE_KEY.to_string()),
            base_url: non_empty(BASE_URL_ENV)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            page_size: DEFAULT_PAGE_SIZE,
            site_dir: non_empty(SITE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            publish,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("pipeline_key", &self.pipeline_key)
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("site_dir", &self.site_dir)
            .field("publish", &self.publish)
            .finish()
    }
}
