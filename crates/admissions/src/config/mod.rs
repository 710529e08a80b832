use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::admissions::rate_limit::RateLimitPolicy;
use crate::workflows::admissions::service::RateLimitSettings;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub rate_limits: RateLimitSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = RateLimitSettings::default();
        let rate_limits = RateLimitSettings {
            submission: load_policy(
                "APP_SUBMISSION_LIMIT",
                "APP_SUBMISSION_WINDOW_SECS",
                defaults.submission,
            )?,
            admin_writes: load_policy(
                "APP_ADMIN_WRITE_LIMIT",
                "APP_ADMIN_WRITE_WINDOW_SECS",
                defaults.admin_writes,
            )?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            rate_limits,
        })
    }
}

fn load_policy(
    max_var: &'static str,
    window_var: &'static str,
    fallback: RateLimitPolicy,
) -> Result<RateLimitPolicy, ConfigError> {
    let max = match env::var(max_var) {
        Ok(value) => value
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidRateLimit { variable: max_var })?,
        Err(_) => fallback.max,
    };
    let window_seconds = match env::var(window_var) {
        Ok(value) => value.parse::<u64>().ok().filter(|secs| *secs > 0).ok_or(
            ConfigError::InvalidRateLimit {
                variable: window_var,
            },
        )?,
        Err(_) => fallback.window.as_secs(),
    };
    Ok(RateLimitPolicy::per_window(max, window_seconds))
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRateLimit { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRateLimit { variable } => {
                write!(f, "{variable} must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidRateLimit { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
