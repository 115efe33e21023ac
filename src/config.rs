use std::env;

use crate::services::projection::{ProjectionOptions, SubServiceMatching};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    pub cache_ttl_seconds: u32,
    pub sub_service_matching: SubServiceMatching,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            cache_ttl_seconds: parse_ttl(
                &env::var("CACHE_TTL_SECONDS").unwrap_or_else(|_| "300".into()),
            )?,
            sub_service_matching: env::var("SUB_SERVICE_MATCHING")
                .ok()
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<SubServiceMatching>())
                .transpose()?
                .unwrap_or_default(),
        })
    }

    /// Settings for local runs and tests: no database, default knobs.
    pub fn local() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 8080,
            app_base_url: "http://localhost".into(),
            cache_ttl_seconds: 300,
            sub_service_matching: SubServiceMatching::default(),
        }
    }

    pub fn projection_options(&self) -> ProjectionOptions {
        ProjectionOptions {
            sub_service_matching: self.sub_service_matching,
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.cache_ttl_seconds))
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

fn parse_ttl(raw: &str) -> anyhow::Result<u32> {
    raw.trim().parse().map_err(|_| {
        anyhow::anyhow!("CACHE_TTL_SECONDS must be a whole number of seconds up to {}, got '{raw}'", u32::MAX)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_rejects_negative_and_oversized_values() {
        assert_eq!(parse_ttl("300").unwrap(), 300);
        assert_eq!(parse_ttl(" 0 ").unwrap(), 0);
        assert!(parse_ttl("-5").is_err());
        assert!(parse_ttl("9223372036854775807").is_err());
        assert!(parse_ttl("five").is_err());
    }

    #[test]
    fn largest_ttl_converts_to_a_duration() {
        let config = Config {
            cache_ttl_seconds: u32::MAX,
            ..Config::local()
        };
        assert_eq!(config.cache_ttl().num_seconds(), i64::from(u32::MAX));
    }
}
