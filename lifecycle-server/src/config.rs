use std::time::Duration;

use envconfig::Envconfig;
use lifecycle_common::config::ensure_min_duration;
use lifecycle_common::{Binding, ConfigError, EnvDuration};

#[derive(Envconfig, Clone, Debug)]
pub struct ServerConfig {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "8080")]
    pub port: u16,

    #[envconfig(from = "SHUTDOWN_TIMEOUT", default = "30s")]
    pub shutdown_timeout: EnvDuration,
}

impl ServerConfig {
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Binding for ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure_min_duration(
            "SHUTDOWN_TIMEOUT",
            self.shutdown_timeout,
            Duration::from_secs(1),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::load_from(&HashMap::new()).unwrap();

        assert_eq!(config.bind(), "0.0.0.0:8080");
        assert_eq!(config.shutdown_timeout, EnvDuration(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_bad_port_and_timeout() {
        let vars = HashMap::from([("BIND_PORT".to_owned(), "99999".to_owned())]);
        assert_eq!(ServerConfig::load_from(&vars).unwrap_err().field, "BIND_PORT");

        let vars = HashMap::from([("SHUTDOWN_TIMEOUT".to_owned(), "100ms".to_owned())]);
        assert_eq!(
            ServerConfig::load_from(&vars).unwrap_err().field,
            "SHUTDOWN_TIMEOUT"
        );
    }
}
