/// Configuration management for the planning portal
use crate::error::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub portal: PortalPolicyConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Origin of the client shell; portal links point here
    pub portal_base_url: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub max_connections: u32,
}

/// Photographer authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Portal lifecycle policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalPolicyConfig {
    pub token_ttl_days: i64,
    pub launch_debounce_minutes: i64,
    /// Reject draft saves into locked sections
    pub enforce_section_lock: bool,
    /// Attempts for a transaction that hit a lock conflict
    pub tx_max_retries: usize,
}

impl Default for PortalPolicyConfig {
    fn default() -> Self {
        Self {
            token_ttl_days: 30,
            launch_debounce_minutes: 30,
            enforce_section_lock: true,
            tx_max_retries: 5,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub client_requests_per_minute: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            client_requests_per_minute: 120,
            burst_size: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> PortalResult<T> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| PortalError::InvalidArgument(format!("Invalid value for {}", name)))
}

impl PortalConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> PortalResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("PORTAL_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("PORTAL_PORT", "8080")?;
        let portal_base_url = env::var("PORTAL_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let version = env!("CARGO_PKG_VERSION").to_string();

        let data_directory: PathBuf = env::var("PORTAL_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("PORTAL_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("portal.sqlite"));
        let max_connections = parse_var("PORTAL_DB_MAX_CONNECTIONS", "10")?;

        let jwt_secret = env::var("PORTAL_JWT_SECRET")
            .map_err(|_| PortalError::InvalidArgument("PORTAL_JWT_SECRET required".to_string()))?;

        let portal = PortalPolicyConfig {
            token_ttl_days: parse_var("PORTAL_TOKEN_TTL_DAYS", "30")?,
            launch_debounce_minutes: parse_var("PORTAL_LAUNCH_DEBOUNCE_MINUTES", "30")?,
            enforce_section_lock: parse_var("PORTAL_ENFORCE_SECTION_LOCK", "true")?,
            tx_max_retries: parse_var("PORTAL_TX_MAX_RETRIES", "5")?,
        };

        let rate_limit = RateLimitConfig {
            enabled: parse_var("PORTAL_RATE_LIMITS_ENABLED", "true")?,
            client_requests_per_minute: parse_var("PORTAL_RATE_LIMIT_CLIENT_PER_MINUTE", "120")?,
            burst_size: parse_var("PORTAL_RATE_LIMIT_BURST", "30")?,
        };

        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(PortalConfig {
            service: ServiceConfig {
                hostname,
                port,
                portal_base_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                max_connections,
            },
            authentication: AuthConfig { jwt_secret },
            portal,
            rate_limit,
            logging: LoggingConfig { level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> PortalResult<()> {
        if self.service.hostname.is_empty() {
            return Err(PortalError::InvalidArgument("Hostname cannot be empty".to_string()));
        }

        if reqwest::Url::parse(&self.service.portal_base_url).is_err() {
            return Err(PortalError::InvalidArgument(format!(
                "PORTAL_BASE_URL is not a valid URL: {}",
                self.service.portal_base_url
            )));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(PortalError::InvalidArgument(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.portal.token_ttl_days <= 0 || self.portal.launch_debounce_minutes < 0 {
            return Err(PortalError::InvalidArgument(
                "Token lifetime must be positive and debounce non-negative".to_string(),
            ));
        }

        if self.portal.tx_max_retries == 0 {
            return Err(PortalError::InvalidArgument(
                "PORTAL_TX_MAX_RETRIES must be at least 1".to_string(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(PortalError::InvalidArgument(
                "PORTAL_DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration used by unit tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        PortalConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 8080,
                portal_base_url: "https://portal.example.com".to_string(),
                version: "test".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from(":memory:"),
                max_connections: 1,
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
            },
            portal: PortalPolicyConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}
