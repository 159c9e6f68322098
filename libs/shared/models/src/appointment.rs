use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted appointment row.
///
/// `start_time` is a naive local wall-clock value; no time zone is attached.
/// `created_at` is assigned by the persistence gateway when the row is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_name: String,
    pub reason: Option<String>,
    pub start_time: NaiveDateTime,
    pub canceled: bool,
    pub created_at: DateTime<Utc>,
}

/// An appointment that has not been written yet. The gateway fills in
/// `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_name: String,
    pub reason: Option<String>,
    pub start_time: NaiveDateTime,
    pub canceled: bool,
}

impl NewAppointment {
    pub fn new(patient_name: String, reason: Option<String>, start_time: NaiveDateTime) -> Self {
        Self {
            patient_name,
            reason,
            start_time,
            canceled: false,
        }
    }
}
