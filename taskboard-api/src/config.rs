/// Configuration management
///
/// Configuration comes from environment variables; a `.env` file is loaded
/// first when present (development).
///
/// | Variable | Default |
/// |---|---|
/// | `DATABASE_URL` | required |
/// | `DATABASE_MAX_CONNECTIONS` | `10` |
/// | `API_HOST` | `0.0.0.0` |
/// | `API_PORT` | `8080` |
/// | `JWT_SECRET` | required, at least 32 characters |
/// | `JWT_ACCESS_TTL_MINUTES` | `10080` (7 days) |
/// | `JWT_REFRESH_TTL_DAYS` | `30` |
/// | `CORS_ORIGINS` | `*` (comma-separated list) |
/// | `PRODUCTION` | `false` |
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// let config = Config::from_env().expect("invalid configuration");
/// println!("listening on {}", config.bind_address());
/// ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use taskboard_shared::auth::jwt::TokenLifetimes;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Enables HSTS
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(skip_serializing)]
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl JwtConfig {
    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: Duration::minutes(self.access_ttl_minutes),
            refresh: Duration::days(self.refresh_ttl_days),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            );
        }

        let access_ttl_minutes: i64 = get("JWT_ACCESS_TTL_MINUTES", "10080").parse()?;
        let refresh_ttl_days: i64 = get("JWT_REFRESH_TTL_DAYS", "30").parse()?;
        if access_ttl_minutes <= 0 || refresh_ttl_days <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }

        let cors_origins = get("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let production = matches!(
            get("PRODUCTION", "false").to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );

        Ok(Self {
            api: ApiConfig {
                host: get("API_HOST", "0.0.0.0"),
                port: get("API_PORT", "8080").parse()?,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get("DATABASE_MAX_CONNECTIONS", "10").parse()?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.access_ttl_minutes, 10080);
        assert_eq!(config.jwt.lifetimes().access, Duration::days(7));
        assert_eq!(config.jwt.lifetimes().refresh, Duration::days(30));
        assert!(config.allows_any_origin());
        assert!(!config.api.production);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("JWT_ACCESS_TTL_MINUTES", "15"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("PRODUCTION", "true"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.jwt.lifetimes().access, Duration::minutes(15));
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(!config.allows_any_origin());
        assert!(config.api.production);
    }

    #[test]
    fn test_required_and_invalid_values() {
        assert!(config_from(&[("JWT_SECRET", SECRET)]).is_err());
        assert!(config_from(&[("DATABASE_URL", "postgresql://localhost/test")]).is_err());
        assert!(config_from(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", "too-short"),
        ])
        .is_err());
        assert!(config_from(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "not-a-port"),
        ])
        .is_err());
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let config = config_from(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
        ])
        .unwrap();

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains(SECRET));
    }
}
