//! Configuration module for the club backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Default upload limit per file: 5 MiB.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name} value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Credentials and location of the external media host.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Root folder uploads are stored under
    pub folder: String,
    pub timeout_secs: u64,
}

/// Account created at startup when no admin exists yet.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Static bearer token with admin rights, for automation
    pub service_token: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Largest accepted image file, in bytes
    pub max_upload_bytes: usize,
    /// Media host settings; uploads are refused when absent
    pub media: Option<MediaConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let service_token = env::var("CLUB_SERVICE_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        let db_path = env::var("CLUB_DB_PATH")
            .unwrap_or_else(|_| "./data/club.sqlite".to_string())
            .into();

        let bind_addr = parse_var("CLUB_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("CLUB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("CLUB_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") | Err(_) => LogFormat::Pretty,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "CLUB_LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        let max_upload_bytes =
            parse_var("CLUB_MAX_UPLOAD_BYTES", &DEFAULT_MAX_UPLOAD_BYTES.to_string())?;

        let media = match (
            env::var("CLUB_MEDIA_CLOUD_NAME"),
            env::var("CLUB_MEDIA_API_KEY"),
            env::var("CLUB_MEDIA_API_SECRET"),
        ) {
            (Ok(cloud_name), Ok(api_key), Ok(api_secret)) => Some(MediaConfig {
                base_url: env::var("CLUB_MEDIA_BASE_URL")
                    .unwrap_or_else(|_| "https://api.cloudinary.com/v1_1".to_string()),
                cloud_name,
                api_key,
                api_secret,
                folder: env::var("CLUB_MEDIA_FOLDER").unwrap_or_else(|_| "club".to_string()),
                timeout_secs: parse_var("CLUB_MEDIA_TIMEOUT_SECS", "30")?,
            }),
            _ => None,
        };

        let bootstrap_admin = match (env::var("CLUB_ADMIN_EMAIL"), env::var("CLUB_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            service_token,
            db_path,
            bind_addr,
            log_level,
            log_format,
            max_upload_bytes,
            media,
            bootstrap_admin,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(name).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
