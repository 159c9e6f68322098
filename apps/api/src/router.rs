use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use shared_database::SharedGateway;

pub fn create_router(gateway: SharedGateway) -> Router {
    Router::new()
        .route("/", get(|| async { "Appointment Booking API is running!" }))
        .merge(appointment_routes(gateway))
}
