//! Runtime settings.
//!
//! Layered, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional `configserver.{toml,yaml,json}` file in the working directory
//! 3. environment variables prefixed `CONFIGSERVER_`, with `__` separating
//!    nested keys (`CONFIGSERVER_DATABASE__URL`, `CONFIGSERVER_AUTH__JWT_SECRET`)

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "CONFIGSERVER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub http: HttpSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub app: AppSettings,
    pub smtp: SmtpSettings,
    pub seed: SeedSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    pub bind: String,
}

/// Without a URL the server runs on the in-memory backend.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub reset_token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Base URL of the web client; used to build links in emails.
    pub public_url: String,
}

/// Without a host, outgoing mail is only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    #[serde(default)]
    pub host: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    pub default_users: bool,
    pub sample_data: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `json` or `pretty`.
    pub format: String,
}

impl Settings {
    /// Load from the working directory and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load with an explicit environment source (tests pass a fixed map).
    pub fn from_env(env: Environment) -> Result<Self, ConfigError> {
        let settings = defaults(Config::builder())?
            .add_source(File::with_name("configserver").required(false))
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must not be empty".to_string()));
        }
        if self.auth.token_ttl_secs <= 0 || self.auth.reset_token_ttl_hours <= 0 {
            return Err(ConfigError::Message("auth token lifetimes must be positive".to_string()));
        }
        if !matches!(self.log.format.as_str(), "json" | "pretty") {
            return Err(ConfigError::Message(format!(
                "log.format must be 'json' or 'pretty', got '{}'",
                self.log.format
            )));
        }
        Ok(())
    }
}

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

fn defaults(builder: Builder) -> Result<Builder, ConfigError> {
    builder
        .set_default("http.bind", "0.0.0.0:8080")?
        .set_default("database.max_connections", 10)?
        .set_default("auth.jwt_secret", "change-me-in-production")?
        .set_default("auth.token_ttl_secs", 86_400)?
        .set_default("auth.reset_token_ttl_hours", 24)?
        .set_default("auth.bcrypt_cost", 12)?
        .set_default("app.public_url", "http://localhost:3000")?
        .set_default("smtp.port", 587)?
        .set_default("smtp.from", "noreply@configserver.local")?
        .set_default("seed.default_users", true)?
        .set_default("seed.sample_data", false)?
        .set_default("log.format", "json")
}
