use std::time::Duration;

use envconfig::Envconfig;
use lifecycle_common::config::{ensure_min_duration, ensure_range};
use lifecycle_common::{Binding, ConfigError, EnvDuration, FlexBool};

#[derive(Envconfig, Clone, Debug)]
pub struct DatabaseConfig {
    #[envconfig(from = "DATABASE_URL", default = "mock://localhost:5432/testdb")]
    pub database_url: String,

    #[envconfig(from = "DATABASE_MAX_CONNECTIONS", default = "10")]
    pub max_connections: u32,

    #[envconfig(from = "DATABASE_CONNECT_TIMEOUT", default = "5s")]
    pub connect_timeout: EnvDuration,

    #[envconfig(from = "DATABASE_ENABLE_METRICS", default = "true")]
    pub enable_metrics: FlexBool,
}

impl Binding for DatabaseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_range("DATABASE_MAX_CONNECTIONS", self.max_connections, 1, 100)?;
        ensure_min_duration(
            "DATABASE_CONNECT_TIMEOUT",
            self.connect_timeout,
            Duration::from_secs(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<DatabaseConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DatabaseConfig::load_from(&vars)
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.database_url, "mock://localhost:5432/testdb");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connect_timeout, EnvDuration(Duration::from_secs(5)));
        assert!(*config.enable_metrics);
    }

    #[test]
    fn accepts_values_at_the_bounds() {
        for connections in ["1", "100"] {
            let config = load(&[
                ("DATABASE_MAX_CONNECTIONS", connections),
                ("DATABASE_CONNECT_TIMEOUT", "1s"),
                ("DATABASE_ENABLE_METRICS", "false"),
            ])
            .unwrap();

            assert!((1..=100).contains(&config.max_connections));
            assert_eq!(config.connect_timeout, EnvDuration(Duration::from_secs(1)));
            assert!(!*config.enable_metrics);
        }
    }

    #[test]
    fn rejects_out_of_range_connection_counts() {
        for connections in ["0", "101", "-3", "ten"] {
            let err = load(&[("DATABASE_MAX_CONNECTIONS", connections)]).unwrap_err();

            assert_eq!(err.field, "DATABASE_MAX_CONNECTIONS", "{connections}");
        }
    }

    #[test]
    fn rejects_short_or_malformed_timeouts() {
        for timeout in ["999ms", "0", "5"] {
            let err = load(&[("DATABASE_CONNECT_TIMEOUT", timeout)]).unwrap_err();

            assert_eq!(err.field, "DATABASE_CONNECT_TIMEOUT", "{timeout}");
        }
    }

    #[test]
    fn rejects_malformed_booleans() {
        let err = load(&[("DATABASE_ENABLE_METRICS", "sometimes")]).unwrap_err();

        assert_eq!(err.field, "DATABASE_ENABLE_METRICS");
    }
}
