use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use shared_models::appointment::{Appointment, NewAppointment};

use crate::error::Result;

/// Row predicate understood by every gateway. Unset fields do not constrain.
///
/// The time bounds form a half-open range: `starts_at_or_after <= start_time < starts_before`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub patient_name: Option<String>,
    pub starts_at_or_after: Option<NaiveDateTime>,
    pub starts_before: Option<NaiveDateTime>,
    pub canceled: Option<bool>,
}

impl AppointmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient_name(mut self, name: impl Into<String>) -> Self {
        self.patient_name = Some(name.into());
        self
    }

    pub fn starting_between(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.starts_at_or_after = Some(start);
        self.starts_before = Some(end);
        self
    }

    pub fn canceled(mut self, canceled: bool) -> Self {
        self.canceled = Some(canceled);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppointmentOrder {
    /// Earliest first; equal start times by ascending `id`.
    #[default]
    StartTimeAsc,
}

/// Field changes applied by a batch update. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentChanges {
    pub canceled: Option<bool>,
}

impl AppointmentChanges {
    pub fn cancel() -> Self {
        Self { canceled: Some(true) }
    }

    pub fn is_empty(&self) -> bool {
        self.canceled.is_none()
    }
}

/// Transactional access to the appointment table.
///
/// Each call is one unit of work: it either commits entirely or leaves the
/// table untouched.
#[async_trait]
pub trait AppointmentGateway: Send + Sync {
    /// Insert a row and return it as stored, with `id` and `created_at` assigned.
    async fn create(&self, record: NewAppointment) -> Result<Appointment>;

    async fn query(&self, filter: AppointmentFilter, order: AppointmentOrder) -> Result<Vec<Appointment>>;

    /// Apply `changes` to every row matching `filter`; returns how many rows changed.
    async fn update_matching(&self, filter: AppointmentFilter, changes: AppointmentChanges) -> Result<u64>;
}

pub type SharedGateway = Arc<dyn AppointmentGateway>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_filter_builder_sets_each_field() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 24).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 25).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let filter = AppointmentFilter::new()
            .patient_name("John Doe")
            .starting_between(start, end)
            .canceled(false);

        assert_eq!(
            filter,
            AppointmentFilter {
                patient_name: Some("John Doe".to_string()),
                starts_at_or_after: Some(start),
                starts_before: Some(end),
                canceled: Some(false),
            }
        );
        assert_eq!(AppointmentFilter::new(), AppointmentFilter::default());
    }

    #[test]
    fn test_cancel_changes_are_not_empty() {
        assert!(AppointmentChanges::default().is_empty());
        assert!(!AppointmentChanges::cancel().is_empty());
    }
}
