// Configuration management

use crate::core::crypto::{SharedSecret, DEFAULT_TOKEN_TTL_HOURS};
use crate::core::errors::FinplanError;
use crate::core::password::{DEFAULT_BCRYPT_COST, MIN_BCRYPT_COST};
use secrecy::Secret;
use std::env;
use std::fmt;
use std::str::FromStr;

const MAX_BCRYPT_COST: u32 = 31;

/// Ten years; keeps the lifetime inside chrono's range
const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365 * 10;

/// Which process this configuration is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    Identity,
    Gateway,
}

impl ServiceRole {
    pub fn default_port(&self) -> u16 {
        match self {
            ServiceRole::Identity => 50051,
            ServiceRole::Gateway => 8080,
        }
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceRole::Identity => f.write_str("identity"),
            ServiceRole::Gateway => f.write_str("gateway"),
        }
    }
}

/// How the gateway checks bearer tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// In-process, with the shared secret
    Local,
    /// Through the identity service's verify RPC
    Remote,
}

impl FromStr for VerifyMode {
    type Err = FinplanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(VerifyMode::Local),
            "remote" => Ok(VerifyMode::Remote),
            other => Err(FinplanError::ConfigurationError(format!(
                "Invalid VERIFY_MODE '{}': must be 'local' or 'remote'",
                other
            ))),
        }
    }
}

/// Application configuration loaded from environment variables
///
/// One struct serves both roles; fields a role does not use keep their
/// defaults. All configuration is validated on load with clear error messages.
#[derive(Debug, Clone)]
pub struct Config {
    pub role: ServiceRole,

    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Token configuration
    pub jwt_secret: SharedSecret,
    pub token_ttl_hours: u64,
    pub bcrypt_cost: u32,

    // Credential store (identity role)
    pub database_url: Option<Secret<String>>,
    pub store_timeout_secs: u64,

    // Remote services (gateway role)
    pub identity_service_url: String,
    pub user_service_url: String,
    pub transaction_service_url: String,
    pub rpc_timeout_secs: u64,
    pub verify_mode: VerifyMode,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

/// Variable source: the process environment, or a map in tests
struct Vars<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env(role: ServiceRole) -> Result<Self, FinplanError> {
        // Load .env file if present (development)
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // Ignore errors (file may not exist)
        }

        Self::from_lookup(role, |key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(role: ServiceRole, lookup: F) -> Result<Self, FinplanError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup: &lookup };

        let config = Self {
            role,
            bind_address: vars.get_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: vars.parse_port(role.default_port())?,
            jwt_secret: vars.get_secret("JWT_SECRET")?,
            token_ttl_hours: vars.parse_or_default("TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS as u64)?,
            bcrypt_cost: vars.parse_or_default("BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
            database_url: vars.get_optional("DATABASE_URL").map(Secret::new),
            store_timeout_secs: vars.parse_or_default("STORE_TIMEOUT_SECS", 2)?,
            identity_service_url: vars.get_or_default("IDENTITY_SERVICE_URL", "http://localhost:50051"),
            user_service_url: vars.get_or_default("USER_SERVICE_URL", "http://localhost:50052"),
            transaction_service_url: vars
                .get_or_default("TRANSACTION_SERVICE_URL", "http://localhost:50053"),
            rpc_timeout_secs: vars.parse_or_default("RPC_TIMEOUT_SECS", 5)?,
            verify_mode: vars.get_or_default("VERIFY_MODE", "local").parse()?,
            request_timeout_secs: vars.parse_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: vars.parse_or_default("BODY_SIZE_LIMIT_BYTES", 1024 * 1024)?,
            log_level: vars.get_or_default("LOG_LEVEL", "info"),
            log_format: vars.get_or_default("LOG_FORMAT", "json"),
        };

        // Post-load validation
        config.validate()?;

        Ok(config)
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), FinplanError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(FinplanError::ConfigurationError(format!(
                "Invalid BCRYPT_COST '{}': must be between {} and {}",
                self.bcrypt_cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }

        if self.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(FinplanError::ConfigurationError(format!(
                "Invalid TOKEN_TTL_HOURS '{}': must be at most {}",
                self.token_ttl_hours, MAX_TOKEN_TTL_HOURS
            )));
        }

        if self.role == ServiceRole::Gateway {
            Self::validate_url(&self.identity_service_url, "IDENTITY_SERVICE_URL")?;
            Self::validate_url(&self.user_service_url, "USER_SERVICE_URL")?;
            Self::validate_url(&self.transaction_service_url, "TRANSACTION_SERVICE_URL")?;
        }

        // Validate log level
        Self::validate_log_level(&self.log_level)?;

        // Validate log format
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate URL format
    fn validate_url(url: &str, key: &str) -> Result<(), FinplanError> {
        url::Url::parse(url).map_err(|e| {
            FinplanError::ConfigurationError(format!("Invalid {} '{}': {}", key, url, e))
        })?;
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), FinplanError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(FinplanError::ConfigurationError(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), FinplanError> {
        if format != "json" && format != "text" {
            return Err(FinplanError::ConfigurationError(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }

    /// Token lifetime as a chrono duration
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours as i64)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Vars<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    /// Get variable or return default value
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Get optional variable; empty counts as unset
    fn get_optional(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Required shared secret
    fn get_secret(&self, key: &str) -> Result<SharedSecret, FinplanError> {
        let value = self
            .get(key)
            .ok_or_else(|| FinplanError::ConfigurationError(format!("{} not set", key)))?;

        if value.is_empty() {
            return Err(FinplanError::ConfigurationError(format!("{} is empty", key)));
        }

        Ok(SharedSecret::new(value)?)
    }

    /// Parse port from PORT, falling back to the role default
    fn parse_port(&self, default: u16) -> Result<u16, FinplanError> {
        let Some(port_str) = self.get("PORT") else {
            return Ok(default);
        };
        let port = port_str.parse::<u16>().map_err(|e| {
            FinplanError::ConfigurationError(format!("Invalid PORT value '{}': {}", port_str, e))
        })?;

        if port == 0 {
            return Err(FinplanError::ConfigurationError(
                "PORT must be between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    /// Parse a positive number or return default
    fn parse_or_default<T>(&self, key: &str, default: T) -> Result<T, FinplanError>
    where
        T: FromStr + PartialEq + Default,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(value) => {
                let parsed = value.parse::<T>().map_err(|e| {
                    FinplanError::ConfigurationError(format!(
                        "Invalid {} value '{}': {}",
                        key, value, e
                    ))
                })?;

                if parsed == T::default() {
                    return Err(FinplanError::ConfigurationError(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            None => Ok(default),
        }
    }
}

impl Config {
    /// Create a test configuration for unit tests
    ///
    /// This bypasses environment variable loading for use in tests that
    /// don't need real configuration.
    pub fn test_config(role: ServiceRole) -> Self {
        Self {
            role,
            bind_address: "127.0.0.1".to_string(),
            port: role.default_port(),
            jwt_secret: SharedSecret::test_secret(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS as u64,
            bcrypt_cost: MIN_BCRYPT_COST,
            database_url: None,
            store_timeout_secs: 2,
            identity_service_url: "http://localhost:50051".to_string(),
            user_service_url: "http://localhost:50052".to_string(),
            transaction_service_url: "http://localhost:50053".to_string(),
            rpc_timeout_secs: 5,
            verify_mode: VerifyMode::Local,
            request_timeout_secs: 30,
            body_size_limit_bytes: 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}
