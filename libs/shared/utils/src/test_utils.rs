use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

use shared_config::{AppConfig, DatabaseBackend};

pub struct TestConfig {
    pub database_url: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_backend: DatabaseBackend::Sqlite,
            database_url: self.database_url.clone(),
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_supabase_config(&self) -> AppConfig {
        AppConfig {
            database_backend: DatabaseBackend::Supabase,
            ..self.to_app_config()
        }
    }
}

/// `2026-01-24` at the given wall-clock time.
pub fn test_datetime(hour: u32, minute: u32) -> NaiveDateTime {
    test_date()
        .and_hms_opt(hour, minute, 0)
        .expect("valid test time")
}

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 24).expect("valid test date")
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn appointment_response(id: i64, patient_name: &str, start_time: &str, canceled: bool) -> Value {
        json!({
            "id": id,
            "patient_name": patient_name,
            "reason": "Checkup",
            "start_time": start_time,
            "canceled": canceled,
            "created_at": "2026-01-01T08:00:00+00:00"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
