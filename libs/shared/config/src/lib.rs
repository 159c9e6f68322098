use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which persistence gateway backs the appointment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    Supabase,
}

impl FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "supabase" => Ok(Self::Supabase),
            other => Err(format!("unknown database backend '{}'", other)),
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Supabase => write!(f, "supabase"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_backend: DatabaseBackend,
    pub database_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub host: String,
    pub port: u16,
}

pub const DEFAULT_DATABASE_URL: &str = "appointments.db";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4444;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_backend: DatabaseBackend::Sqlite,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_backend: env::var("DATABASE_BACKEND")
                .ok()
                .and_then(|value| {
                    value
                        .parse()
                        .map_err(|e| warn!("{}, falling back to sqlite", e))
                        .ok()
                })
                .unwrap_or_default(),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using {}", DEFAULT_DATABASE_URL);
                    DEFAULT_DATABASE_URL.to_string()
                }),
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_default(),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_default(),
            host: env::var("HOST")
                .unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|value| {
                    value
                        .parse()
                        .map_err(|_| warn!("PORT '{}' is not a valid port, using {}", value, DEFAULT_PORT))
                        .ok()
                })
                .unwrap_or(DEFAULT_PORT),
        };

        if config.database_backend == DatabaseBackend::Supabase && !config.is_configured() {
            warn!("Supabase backend selected but SUPABASE_URL / SUPABASE_ANON_PUBLIC_KEY are missing");
        }

        config
    }

    /// True when the Supabase gateway has everything it needs.
    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
