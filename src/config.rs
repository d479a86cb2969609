use std::env;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_file: String,
    pub log_level: log::LevelFilter,
    /// Origin allowed by CORS, any origin when unset
    pub cors_origin: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SEMINAR_PORT must be a valid port number, got {0:?}")]
    InvalidPort(String),
    #[error("SEMINAR_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost(#[from] std::net::AddrParseError),
    #[error("SEMINAR_LOG_LEVEL must be one of off, error, warn, info, debug, trace; got {0:?}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Reads the configuration from the environment, after loading `.env` if there is one
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("SEMINAR_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = match lookup("SEMINAR_PORT") {
            Some(port) => port.trim().parse().map_err(|_| ConfigError::InvalidPort(port))?,
            None => 3030,
        };

        let log_level = match lookup("SEMINAR_LOG_LEVEL") {
            Some(level) => level
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidLogLevel(level))?,
            None => log::LevelFilter::Info,
        };

        Ok(Self {
            host,
            port,
            db_file: lookup("SEMINAR_DB_FILE").unwrap_or_else(|| "db.json".to_string()),
            log_level,
            cors_origin: lookup("SEMINAR_CORS_ORIGIN").filter(|origin| !origin.trim().is_empty()),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:3030".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_file, "db.json");
        assert_eq!(config.log_level, log::LevelFilter::Info);
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("SEMINAR_HOST", "localhost"),
            ("SEMINAR_PORT", "8080"),
            ("SEMINAR_DB_FILE", "/var/lib/seminars.json"),
            ("SEMINAR_LOG_LEVEL", "debug"),
            ("SEMINAR_CORS_ORIGIN", "https://seminars.example.org"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_file, "/var/lib/seminars.json");
        assert_eq!(config.log_level, log::LevelFilter::Debug);
        assert_eq!(
            config.cors_origin.as_deref(),
            Some("https://seminars.example.org")
        );
    }

    #[test]
    fn invalid_values() {
        assert!(matches!(
            config(&[("SEMINAR_PORT", "http")]),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            config(&[("SEMINAR_LOG_LEVEL", "loud")]),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert!(matches!(
            config(&[("SEMINAR_HOST", "seminars.local")]).unwrap().socket_addr(),
            Err(ConfigError::InvalidHost(_))
        ));
    }
}
