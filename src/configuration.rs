use std::path::PathBuf;

use config::{Config, Environment as EnvironmentSource, File, FileFormat};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub username: String,
    pub password: Secret<String>,
    pub database: String,
    /// Full connection string. Takes precedence over the individual parts.
    #[serde(default)]
    pub url: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub acquire_timeout_seconds: u64,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> Secret<String> {
        if let Some(url) = &self.url {
            return url.clone();
        }

        Secret::new(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database,
        ))
    }

    pub fn acquire_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.acquire_timeout_seconds)
    }
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub environment: Environment,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub frontend_url: Option<String>,
    pub static_dir: PathBuf,
}

impl ApplicationSettings {
    /// Configured origins plus the deployed front end, if any.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = self.allowed_origins.clone();
        if let Some(frontend_url) = self.frontend_url.as_deref() {
            let frontend_url = frontend_url.trim_end_matches('/');
            if !frontend_url.is_empty() && !origins.iter().any(|o| o == frontend_url) {
                origins.push(frontend_url.to_string());
            }
        }
        origins
    }
}

/// Runtime mode. Controls error verbosity and static asset serving.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `development` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let environment = std::env::var("APP_ENVIRONMENT")
        .ok()
        .map(Environment::try_from)
        .transpose()
        .map_err(config::ConfigError::Message)?;

    let settings = Config::builder()
        .add_source(File::new("configuration.yaml", FileFormat::Yaml))
        .add_source(
            EnvironmentSource::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("application.port", std::env::var("PORT").ok())?
        .set_override_option("application.frontend_url", std::env::var("FRONTEND_URL").ok())?
        .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
        .set_override_option(
            "application.environment",
            environment.map(|e| e.as_str().to_string()),
        )?
        .build()?;

    settings.try_deserialize::<Settings>()
}
