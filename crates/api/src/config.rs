//! Application configuration loaded from environment variables.

use events::EventsConfig;

use crate::users::UserClientConfig;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
/// - `DATABASE_URL`: Postgres connection string; unset keeps orders in memory
/// - `KAFKA_BROKER`, `KAFKA_TOPIC`, `KAFKA_CONSUMER_GROUP`, `KAFKA_PARTITIONS`
/// - `USER_API_URL`: base URL of the user service
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub events: EventsConfig,
    pub users: UserClientConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: non_empty("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            database_url: non_empty("DATABASE_URL"),
            events: EventsConfig {
                broker: non_empty("KAFKA_BROKER").unwrap_or(defaults.events.broker),
                topic: non_empty("KAFKA_TOPIC").unwrap_or(defaults.events.topic),
                consumer_group: non_empty("KAFKA_CONSUMER_GROUP")
                    .unwrap_or(defaults.events.consumer_group),
                partitions: non_empty("KAFKA_PARTITIONS")
                    .and_then(|p| p.parse().ok())
                    .filter(|p: &i32| *p > 0)
                    .unwrap_or(defaults.events.partitions),
                flush_timeout: defaults.events.flush_timeout,
            },
            users: UserClientConfig {
                base_url: non_empty("USER_API_URL").unwrap_or(defaults.users.base_url),
                ..defaults.users
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            events: EventsConfig::default(),
            users: UserClientConfig::default(),
        }
    }
}
