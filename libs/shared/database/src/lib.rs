pub mod error;
pub mod gateway;
pub mod sqlite;
pub mod supabase;

use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, DatabaseBackend};

pub use error::{DatabaseError, Result};
pub use gateway::{AppointmentChanges, AppointmentFilter, AppointmentGateway, AppointmentOrder, SharedGateway};
pub use sqlite::SqliteGateway;
pub use supabase::SupabaseGateway;

/// Open the gateway selected by `config.database_backend`.
pub fn connect(config: &AppConfig) -> Result<SharedGateway> {
    match config.database_backend {
        DatabaseBackend::Sqlite => {
            info!("Opening SQLite appointment store at {}", config.database_url);
            let gateway: SharedGateway = Arc::new(SqliteGateway::open(&config.database_url)?);
            Ok(gateway)
        }
        DatabaseBackend::Supabase => {
            if !config.is_configured() {
                return Err(DatabaseError::Configuration(
                    "SUPABASE_URL and SUPABASE_ANON_PUBLIC_KEY are required for the supabase backend".to_string(),
                ));
            }
            info!("Using Supabase appointment store at {}", config.supabase_url);
            let gateway: SharedGateway = Arc::new(SupabaseGateway::new(config));
            Ok(gateway)
        }
    }
}
