// rest_api/src/config.rs

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File as ConfigFile};
use notifications_service::SmtpSettings;
use serde::Deserialize;

use crate::file_host::CloudinarySettings;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8082";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Optional file read before the environment. Environment variables win.
pub const CONFIG_FILE: &str = "medipal.toml";

/// Settings for the HTTP server, read from `medipal.toml` (if present) and
/// then from the environment, after `.env` has been loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session_secret: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub smtp_from: Option<String>,

    #[serde(default)]
    pub cloudinary_cloud_name: Option<String>,
    #[serde(default)]
    pub cloudinary_api_key: Option<String>,
    #[serde(default)]
    pub cloudinary_api_secret: Option<String>,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl AppConfig {
    /// SMTP settings when host, user and password are all set.
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        Some(SmtpSettings {
            host: present(&self.smtp_host)?,
            port: self.smtp_port,
            username: present(&self.smtp_user)?,
            password: present(&self.smtp_password)?,
            from: present(&self.smtp_from),
        })
    }

    pub fn cloudinary_settings(&self) -> Option<CloudinarySettings> {
        Some(CloudinarySettings {
            cloud_name: present(&self.cloudinary_cloud_name)?,
            api_key: present(&self.cloudinary_api_key)?,
            api_secret: present(&self.cloudinary_api_secret)?,
        })
    }
}

/// Loads `.env`, then builds the configuration. Command line values, when
/// given, override every other source.
pub fn load_app_config(database_url: Option<&str>, bind_address: Option<&str>) -> Result<AppConfig> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to read .env file");
        }
    }

    let mut config_builder = Config::builder();
    if Path::new(CONFIG_FILE).exists() {
        config_builder = config_builder.add_source(ConfigFile::with_name(CONFIG_FILE));
    }
    let config = config_builder
        .add_source(Environment::default())
        .set_override_option("database_url", database_url)?
        .set_override_option("bind_address", bind_address)?
        .build()
        .context("Failed to build configuration")?;

    let app_config: AppConfig = config
        .try_deserialize()
        .context("Invalid configuration, DATABASE_URL and SESSION_SECRET are required")?;
    if app_config.session_secret.trim().is_empty() {
        anyhow::bail!("SESSION_SECRET must not be empty");
    }
    Ok(app_config)
}
