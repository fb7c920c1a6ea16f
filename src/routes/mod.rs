use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{flights, parameters, reference, reports, tickets};
use crate::middleware::rate_limit::{create_booking_governor, log_request};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Seat-changing calls get a tighter per-IP budget than reads
    let booking_routes = Router::new()
        .route("/", post(tickets::create_ticket))
        .route("/{id}/convert", post(tickets::convert_place_order))
        .route("/{id}/status", put(tickets::update_status))
        .layer(create_booking_governor());

    let ticket_routes = Router::new()
        .route("/", get(tickets::list_tickets))
        .route("/statuses", get(tickets::list_statuses))
        .route("/booking-types", get(tickets::list_booking_types))
        .route("/{id}", get(tickets::get_ticket).delete(tickets::delete_ticket))
        .merge(booking_routes);

    let flight_routes = Router::new()
        .route("/", get(flights::list_flights).post(flights::create_flight))
        .route(
            "/{code}",
            get(flights::get_flight)
                .put(flights::update_flight)
                .delete(flights::delete_flight),
        )
        .route("/{code}/tickets", get(flights::flight_tickets))
        .route(
            "/{code}/cancel-place-orders",
            post(flights::cancel_place_orders),
        );

    let report_routes = Router::new()
        .route("/monthly", get(reports::monthly_report))
        .route("/yearly", get(reports::yearly_report));

    let reference_routes = Router::new()
        .route("/airports", get(reference::list_airports))
        .route("/airports/{code}", get(reference::get_airport))
        .route("/planes", get(reference::list_planes))
        .route("/planes/{code}", get(reference::get_plane))
        .route("/ticket-classes", get(reference::list_ticket_classes))
        .route(
            "/parameters",
            get(parameters::get_parameters).put(parameters::update_parameters),
        );

    Router::new()
        .nest("/api/flights", flight_routes)
        .nest("/api/tickets", ticket_routes)
        .nest("/api/reports", report_routes)
        .nest("/api", reference_routes)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
