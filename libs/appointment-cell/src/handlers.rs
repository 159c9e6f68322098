// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;

use shared_database::SharedGateway;
use shared_models::error::AppError;

use crate::models::{
    Appointment, CancelAppointmentsRequest, CancelAppointmentsResponse, ListAppointmentsQuery,
    ScheduleAppointmentRequest,
};
use crate::services::AppointmentBookingService;

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(gateway): State<SharedGateway>,
    WithRejection(Json(request), _): WithRejection<Json<ScheduleAppointmentRequest>, AppError>,
) -> Result<Json<Appointment>, AppError> {
    let command = request.validate().map_err(AppError::ValidationError)?;
    let booking_service = AppointmentBookingService::new(gateway);

    let appointment = booking_service.schedule(command).await?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn cancel_appointments(
    State(gateway): State<SharedGateway>,
    WithRejection(Json(request), _): WithRejection<Json<CancelAppointmentsRequest>, AppError>,
) -> Result<Json<CancelAppointmentsResponse>, AppError> {
    let command = request.validate().map_err(AppError::ValidationError)?;
    let booking_service = AppointmentBookingService::new(gateway);

    let canceled_count = booking_service.cancel_by_name_and_date(command).await?;

    Ok(Json(CancelAppointmentsResponse { canceled_count }))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(gateway): State<SharedGateway>,
    WithRejection(Query(query), _): WithRejection<Query<ListAppointmentsQuery>, AppError>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let date = query.validate().map_err(AppError::ValidationError)?;
    let booking_service = AppointmentBookingService::new(gateway);

    let appointments = booking_service.list_by_date(date).await?;

    Ok(Json(appointments))
}
