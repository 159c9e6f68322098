// libs/appointment-cell/src/router.rs
use axum::{
    routing::{get, post},
    Router,
};

use shared_database::SharedGateway;

use crate::handlers;

pub fn appointment_routes(gateway: SharedGateway) -> Router {
    Router::new()
        .route("/schedule_appointments/", post(handlers::schedule_appointment))
        .route("/cancel_appointments/", post(handlers::cancel_appointments))
        .route("/list_appointments/", get(handlers::list_appointments))
        .with_state(gateway)
}
