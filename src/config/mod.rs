use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub token_secret: String,
    pub session_duration_hours: i64,
    /// Lifetime of the signed employee credential issued by code verification.
    pub employee_token_hours: i64,
    /// Lifetime of a generated employee access code.
    pub access_code_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Cancellations are rejected strictly inside this window before departure.
    pub cancellation_cutoff_hours: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            cancellation_cutoff_hours: 2,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("auth.session_duration_hours", 24)?
            .set_default("auth.employee_token_hours", 8)?
            .set_default("auth.access_code_minutes", 15)?
            .set_default("booking.cancellation_cutoff_hours", 2)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with TIKITI__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("TIKITI").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://tikiti.db".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                token_secret: "change-me-in-production".to_string(),
                session_duration_hours: 24,
                employee_token_hours: 8,
                access_code_minutes: 15,
            },
            booking: BookingConfig::default(),
        }
    }
}
