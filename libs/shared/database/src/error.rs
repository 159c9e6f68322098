use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Supabase error: {0}")]
    Supabase(String),

    #[error("Malformed appointment record: {0}")]
    Decode(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid database configuration: {0}")]
    Configuration(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
