use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_QUESTION_SECONDS: u32 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub tests_api_url: String,
    pub notifications_api_url: Option<String>,
    pub http_timeout_secs: u64,
    pub default_question_seconds: u32,
    pub require_all_answered: bool,
    pub notify_on_result: bool,
    pub session_retention_secs: u64,
    pub session_idle_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            tests_api_url: get_env("TESTS_API_URL")?,
            notifications_api_url: env::var("NOTIFICATIONS_API_URL").ok(),
            http_timeout_secs: get_env_parse_or("HTTP_TIMEOUT_SECS", 30)?,
            default_question_seconds: get_env_parse_or(
                "DEFAULT_QUESTION_SECONDS",
                DEFAULT_QUESTION_SECONDS,
            )?,
            require_all_answered: get_env_parse_or("REQUIRE_ALL_ANSWERED", true)?,
            notify_on_result: get_env_parse_or("NOTIFY_ON_RESULT", true)?,
            session_retention_secs: get_env_parse_or("SESSION_RETENTION_SECS", 3600)?,
            session_idle_secs: get_env_parse_or("SESSION_IDLE_SECS", 7200)?,
        })
    }

    /// Session-level knobs, split out so sessions can be built without the global config.
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            default_question_seconds: self.default_question_seconds,
            require_all_answered: self.require_all_answered,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub default_question_seconds: u32,
    pub require_all_answered: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            default_question_seconds: DEFAULT_QUESTION_SECONDS,
            require_all_answered: true,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
