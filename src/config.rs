use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub web_dir: String,
    pub db_pool_size: u32,
    /// Bounds pool checkout and SQLite lock waits.
    pub store_timeout: Duration,
    pub session_days: i64,
    pub max_interval_days: f64,
    pub bcrypt_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "finnest.db".to_string(),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            web_dir: "web".to_string(),
            db_pool_size: 8,
            store_timeout: Duration::from_secs(5),
            session_days: 7,
            max_interval_days: 730.0,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; missing or unparseable values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            host: parsed(&lookup, "HOST", defaults.host),
            port: parsed(&lookup, "PORT", defaults.port),
            web_dir: lookup("WEB_DIR").unwrap_or(defaults.web_dir),
            db_pool_size: parsed(&lookup, "DB_POOL_SIZE", defaults.db_pool_size),
            store_timeout: Duration::from_secs(parsed(
                &lookup,
                "STORE_TIMEOUT_SECS",
                defaults.store_timeout.as_secs(),
            )),
            session_days: parsed(&lookup, "SESSION_DAYS", defaults.session_days),
            max_interval_days: parsed(&lookup, "MAX_INTERVAL_DAYS", defaults.max_interval_days),
            bcrypt_cost: parsed(&lookup, "BCRYPT_COST", defaults.bcrypt_cost),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parsed<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("{} has invalid value '{}', using default", key, raw);
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.database_url, "finnest.db");
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.max_interval_days, 730.0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let env: HashMap<&str, &str> = [("PORT", "eighty"), ("DB_POOL_SIZE", "2"), ("HOST", "0.0.0.0")]
            .into_iter()
            .collect();
        let config = AppConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_pool_size, 2);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
