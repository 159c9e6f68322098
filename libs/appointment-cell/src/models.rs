// libs/appointment-cell/src/models.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::validation::ValidationErrors;
use shared_utils::datetime::{parse_calendar_date, parse_timestamp};

pub use shared_models::appointment::Appointment;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Body of `POST /schedule_appointments/`.
///
/// Every field is optional at the serde level so that missing fields are
/// reported per field by [`ScheduleAppointmentRequest::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleAppointmentRequest {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
}

/// Body of `POST /cancel_appointments/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentsRequest {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Query string of `GET /list_appointments/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAppointmentsQuery {
    #[serde(default)]
    pub date: Option<String>,
}

// ==============================================================================
// VALIDATED COMMANDS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleAppointment {
    pub patient_name: String,
    pub reason: Option<String>,
    pub start_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAppointments {
    pub patient_name: String,
    pub date: NaiveDate,
}

fn required_name(errors: &mut ValidationErrors, value: Option<&str>) -> Option<String> {
    match value.map(str::trim) {
        None => {
            errors.add("patient_name", "field required");
            None
        }
        Some("") => {
            errors.add("patient_name", "must not be empty");
            None
        }
        Some(name) => Some(name.to_string()),
    }
}

fn required_with<T>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> Option<T> {
    match value {
        None => {
            errors.add(field, "field required");
            None
        }
        Some(raw) => parse(raw).map_err(|message| errors.add(field, message)).ok(),
    }
}

impl ScheduleAppointmentRequest {
    pub fn validate(&self) -> Result<ScheduleAppointment, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let patient_name = required_name(&mut errors, self.patient_name.as_deref());
        let start_time = required_with(&mut errors, "start_time", self.start_time.as_deref(), parse_timestamp);
        let reason = self
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string);

        match (patient_name, start_time) {
            (Some(patient_name), Some(start_time)) => Ok(ScheduleAppointment {
                patient_name,
                reason,
                start_time,
            }),
            _ => Err(errors),
        }
    }
}

impl CancelAppointmentsRequest {
    pub fn validate(&self) -> Result<CancelAppointments, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let patient_name = required_name(&mut errors, self.patient_name.as_deref());
        let date = required_with(&mut errors, "date", self.date.as_deref(), parse_calendar_date);

        match (patient_name, date) {
            (Some(patient_name), Some(date)) => Ok(CancelAppointments { patient_name, date }),
            _ => Err(errors),
        }
    }
}

impl ListAppointmentsQuery {
    pub fn validate(&self) -> Result<NaiveDate, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        required_with(&mut errors, "date", self.date.as_deref(), parse_calendar_date).ok_or(errors)
    }
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAppointmentsResponse {
    pub canceled_count: u64,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Invalid appointment request: {0}")]
    Validation(ValidationErrors),

    #[error("No matching appointment for {patient_name} on {date}")]
    NotFound { patient_name: String, date: NaiveDate },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ValidationErrors> for AppointmentError {
    fn from(errors: ValidationErrors) -> Self {
        AppointmentError::Validation(errors)
    }
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::Validation(errors) => AppError::ValidationError(errors),
            AppointmentError::NotFound { .. } => {
                AppError::NotFound("No matching appointment for the detail found".to_string())
            }
            AppointmentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
