//! Service configuration loaded from environment variables.
//!
//! Every key has a development default so `cargo run` works against a local
//! MongoDB with no `.env` file. Membership writes run in transactions, so
//! that MongoDB must be a replica set (a single node started with `--replSet`
//! is enough).

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Mongo => "mongo",
            StoreBackend::Memory => "memory",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}', expected mongo or memory", other)),
        }
    }
}

/// Parameters shared with the auth collaborator that issues tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub jwt: JwtSettings,
    pub src_club_name: String,
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            store_backend: StoreBackend::Mongo,
            database_url: "mongodb://localhost:27017/campus_clubs".to_string(),
            jwt: JwtSettings {
                secret: "default-secret-change-me".to_string(),
                issuer: "campus-auth".to_string(),
                audience: "campus-clubs".to_string(),
            },
            src_club_name: "Students' Representative Council".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = get("PORT") {
            config.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    key: "PORT",
                    value: port.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(backend) = get("STORE_BACKEND") {
            config.store_backend = backend.parse().map_err(|reason| ConfigError::Invalid {
                key: "STORE_BACKEND",
                value: backend.clone(),
                reason,
            })?;
        }
        if let Some(url) = get("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(secret) = get("JWT_SECRET") {
            config.jwt.secret = secret;
        }
        if let Some(issuer) = get("JWT_ISSUER") {
            config.jwt.issuer = issuer;
        }
        if let Some(audience) = get("JWT_AUDIENCE") {
            config.jwt.audience = audience;
        }
        if let Some(name) = get("SRC_CLUB_NAME") {
            config.src_club_name = name;
        }
        if let Some(origins) = get("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}
