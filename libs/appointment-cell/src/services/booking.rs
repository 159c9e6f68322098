// libs/appointment-cell/src/services/booking.rs
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use shared_database::{AppointmentChanges, AppointmentOrder, SharedGateway};
use shared_models::appointment::NewAppointment;

use crate::models::{Appointment, AppointmentError, CancelAppointments, ScheduleAppointment};
use crate::services::window::DayWindow;

/// Schedule, cancel and list appointments. Holds no state of its own; every
/// call is a single unit of work against the gateway.
pub struct AppointmentBookingService {
    gateway: SharedGateway,
}

impl AppointmentBookingService {
    pub fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    pub async fn schedule(&self, command: ScheduleAppointment) -> Result<Appointment, AppointmentError> {
        debug!("Scheduling appointment for {} at {}", command.patient_name, command.start_time);

        let record = NewAppointment::new(command.patient_name, command.reason, command.start_time);
        let appointment = self.gateway.create(record).await?;

        info!(appointment_id = appointment.id, "Appointment scheduled");
        Ok(appointment)
    }

    /// Cancel every active appointment `patient_name` has on `date`.
    ///
    /// Zero matches is an error, whether the patient had nothing that day or
    /// everything was already canceled.
    pub async fn cancel_by_name_and_date(&self, command: CancelAppointments) -> Result<u64, AppointmentError> {
        let window = DayWindow::for_date(command.date)?;
        let filter = window
            .filter()
            .patient_name(command.patient_name.clone())
            .canceled(false);

        let canceled_count = self
            .gateway
            .update_matching(filter, AppointmentChanges::cancel())
            .await?;

        if canceled_count == 0 {
            warn!("No active appointments for {} on {}", command.patient_name, command.date);
            return Err(AppointmentError::NotFound {
                patient_name: command.patient_name,
                date: command.date,
            });
        }

        info!(canceled_count, "Canceled appointments for {} on {}", command.patient_name, command.date);
        Ok(canceled_count)
    }

    /// Active appointments on `date`, earliest first.
    pub async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, AppointmentError> {
        let window = DayWindow::for_date(date)?;

        let appointments = self
            .gateway
            .query(window.filter().canceled(false), AppointmentOrder::StartTimeAsc)
            .await?;

        debug!("Found {} appointments on {}", appointments.len(), date);
        Ok(appointments)
    }
}
