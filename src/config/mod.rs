use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub statistics: StatisticsConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Student ids per `IN (...)` list sent to the store
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
}

impl StatisticsConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent_batches.max(1)
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrent_batches: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
    pub slow_query_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub enable_audit_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Pick up DATABASE_URL, JWT_SECRET etc. from a local .env when present
        let _ = dotenvy::dotenv();

        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Statistics overrides
        if let Ok(v) = env::var("STATS_BATCH_SIZE") {
            self.statistics.batch_size = v.parse().unwrap_or(self.statistics.batch_size);
        }
        if let Ok(v) = env::var("STATS_MAX_CONCURRENT_BATCHES") {
            self.statistics.max_concurrent_batches = v.parse().unwrap_or(self.statistics.max_concurrent_batches);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }
        if let Ok(v) = env::var("DATABASE_SLOW_QUERY_THRESHOLD_MS") {
            self.database.slow_query_threshold_ms = v.parse().unwrap_or(self.database.slow_query_threshold_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        if let Ok(v) = env::var("LOG_LEVEL") {
            self.logging.level = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            statistics: StatisticsConfig {
                batch_size: 100,
                max_concurrent_batches: 4,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
                slow_query_threshold_ms: 100,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_audit_logging: false,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            statistics: StatisticsConfig {
                batch_size: 100,
                max_concurrent_batches: 8,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
                slow_query_threshold_ms: 500,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_audit_logging: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            statistics: StatisticsConfig {
                batch_size: 100,
                max_concurrent_batches: 8,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
                slow_query_threshold_ms: 1000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_audit_logging: true,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once on first access
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.statistics.batch_size, 100);
        assert!(config.database.enable_query_logging);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.enable_query_logging);
        assert!(config.security.enable_audit_logging);
        assert_eq!(config.statistics.max_concurrent_batches, 8);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let stats = StatisticsConfig { batch_size: 0, max_concurrent_batches: 0 };
        assert_eq!(stats.effective_batch_size(), 1);
        assert_eq!(stats.effective_concurrency(), 1);
    }
}
