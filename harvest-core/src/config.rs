use crate::error::{ConfigError, CoreError};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "reddit-harvest/0.1";

/// Application configuration: an optional TOML file with environment
/// variable overrides for the credentials.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reddit: RedditSettings,
    pub collection: CollectionSettings,
    pub retry: RetrySettings,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: String,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl fmt::Debug for RedditSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    /// Pause after each post.
    pub sleep_seconds: f64,
    /// Cap applied to a listing requested without a limit.
    pub max_unbounded_posts: u32,
    /// Number of "load more" placeholders resolved per post; the rest are dropped.
    pub replace_more_limit: u32,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            sleep_seconds: 1.0,
            max_unbounded_posts: 1000,
            replace_more_limit: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_sleep_multiplier_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_sleep_multiplier_secs: 5,
        }
    }
}

/// Complete credential set for the password grant.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Reads the file when given, then applies `REDDIT_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound {
                        path: path.display().to_string(),
                    }
                    .into());
                }
                let contents = std::fs::read_to_string(path)?;
                debug!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&contents)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = non_empty("REDDIT_CLIENT_ID") {
            self.reddit.client_id = Some(value);
        }
        if let Some(value) = non_empty("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = Some(value);
        }
        if let Some(value) = non_empty("REDDIT_USERNAME") {
            self.reddit.username = Some(value);
        }
        if let Some(value) = non_empty("REDDIT_PASSWORD") {
            self.reddit.password = Some(value);
        }
        if let Some(value) = non_empty("REDDIT_USER_AGENT") {
            self.reddit.user_agent = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sleep = self.collection.sleep_seconds;
        if !sleep.is_finite() || sleep < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "collection.sleep_seconds".to_string(),
                value: sleep.to_string(),
            });
        }
        if self.collection.max_unbounded_posts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collection.max_unbounded_posts".to_string(),
                value: "0".to_string(),
            });
        }
        if self.retry.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_retries".to_string(),
                value: "0".to_string(),
            });
        }
        if self.reddit.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "reddit.user_agent".to_string(),
            });
        }
        Ok(())
    }

    /// All four credentials are required; a missing one is reported by name.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        fn required(value: &Option<String>, field: &str) -> Result<String, ConfigError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MissingField {
                    field: field.to_string(),
                })
        }

        Ok(Credentials {
            client_id: required(&self.reddit.client_id, "reddit.client_id")?,
            client_secret: required(&self.reddit.client_secret, "reddit.client_secret")?,
            username: required(&self.reddit.username, "reddit.username")?,
            password: required(&self.reddit.password, "reddit.password")?,
            user_agent: self.reddit.user_agent.clone(),
        })
    }
}
