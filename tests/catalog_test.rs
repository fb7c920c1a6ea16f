mod common;

use std::collections::HashSet;

use flight_booking_backend::entities::ticket::BookingType;
use flight_booking_backend::error::ErrorCategory;
use flight_booking_backend::services::parameters::UpdateParametersRequest;

use common::{create_flight, flight_request, setup, stop, ticket_request, utc};

#[tokio::test]
async fn create_assigns_sequential_codes_and_full_inventory() {
    let app = setup().await;

    let first = app
        .catalog
        .create(flight_request("2030-03-15 08:00:00"))
        .await
        .unwrap();
    let second = app
        .catalog
        .create(flight_request("2030-03-16 08:00:00"))
        .await
        .unwrap();

    assert_eq!(first.flight_code, "RuaAirline0001");
    assert_eq!(second.flight_code, "RuaAirline0002");
    // Asia/Ho_Chi_Minh is UTC+7.
    assert_eq!(first.departure_time, utc(2030, 3, 15, 1, 0, 0));
    assert_eq!(first.seats.total_seats, 10);
    assert_eq!(first.seats.booked_seats, 0);
    assert_eq!(first.seats.empty_seats, 10);
    assert_eq!(first.departure_airport.airport_code, "SGN");
    assert_eq!(first.arrival_airport.airport_code, "HAN");
}

#[tokio::test]
async fn rfc3339_departures_keep_their_offset() {
    let app = setup().await;

    let flight = app
        .catalog
        .create(flight_request("2030-03-15T08:00:00+00:00"))
        .await
        .unwrap();
    assert_eq!(flight.departure_time, utc(2030, 3, 15, 8, 0, 0));
}

#[tokio::test]
async fn stops_are_stored_and_returned_in_order() {
    let app = setup().await;
    let mut request = flight_request("2030-03-15 08:00:00");
    request.intermediate_stops = vec![stop("HUI", 5, 20), stop("DAD", 2, 10)];

    let flight = app.catalog.create(request).await.unwrap();

    let orders: Vec<(String, i32)> = flight
        .intermediate_stops
        .iter()
        .map(|s| (s.airport_code.clone(), s.stop_order))
        .collect();
    assert_eq!(orders, vec![("DAD".to_string(), 2), ("HUI".to_string(), 5)]);
}

#[tokio::test]
async fn itinerary_rule_violations_are_bad_requests() {
    let app = setup().await;

    let mut same_endpoints = flight_request("2030-03-15 08:00:00");
    same_endpoints.arrival_airport_code = "SGN".to_string();

    let mut stop_at_departure = flight_request("2030-03-15 08:00:00");
    stop_at_departure.intermediate_stops = vec![stop("SGN", 1, 15)];

    let mut stop_at_arrival = flight_request("2030-03-15 08:00:00");
    stop_at_arrival.intermediate_stops = vec![stop("HAN", 1, 15)];

    let mut repeated_stop = flight_request("2030-03-15 08:00:00");
    repeated_stop.intermediate_stops = vec![stop("DAD", 1, 15), stop("DAD", 2, 15)];

    let in_the_past = flight_request("2029-12-31 10:00:00");
    let unparsable = flight_request("next tuesday");

    for request in [
        same_endpoints,
        stop_at_departure,
        stop_at_arrival,
        repeated_stop,
        in_the_past,
        unparsable,
    ] {
        let err = app.catalog.create(request).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::BadRequest, "{}", err);
    }

    assert!(app.catalog.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_plane_or_airport_is_not_found() {
    let app = setup().await;

    let mut unknown_plane = flight_request("2030-03-15 08:00:00");
    unknown_plane.plane_code = "VN-B787".to_string();
    let err = app.catalog.create(unknown_plane).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    let mut unknown_stop = flight_request("2030-03-15 08:00:00");
    unknown_stop.intermediate_stops = vec![stop("PQC", 1, 15)];
    let err = app.catalog.create(unknown_stop).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
    assert!(err.to_string().contains("PQC"));
}

#[tokio::test]
async fn update_replaces_stops_wholesale() {
    let app = setup().await;
    let mut request = flight_request("2030-03-15 08:00:00");
    request.intermediate_stops = vec![stop("DAD", 1, 15), stop("HUI", 2, 15)];
    let code = app.catalog.create(request).await.unwrap().flight_code;

    let mut changed = flight_request("2030-03-20 10:30:00");
    changed.duration = 150;
    changed.intermediate_stops = vec![stop("CXR", 1, 12)];
    let updated = app.catalog.update(&code, changed).await.unwrap();

    assert_eq!(updated.flight_code, code);
    assert_eq!(updated.duration, 150);
    assert_eq!(updated.departure_time, utc(2030, 3, 20, 3, 30, 0));
    assert_eq!(updated.intermediate_stops.len(), 1);
    assert_eq!(updated.intermediate_stops[0].airport_code, "CXR");
}

#[tokio::test]
async fn update_revalidates_and_requires_an_existing_flight() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;

    let mut too_short = flight_request("2030-03-15 08:00:00");
    too_short.duration = 10;
    let err = app.catalog.update(&code, too_short).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    let err = app
        .catalog
        .update("RuaAirline9999", flight_request("2030-03-15 08:00:00"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn plane_cannot_change_once_seats_are_booked() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;

    let mut other_plane = flight_request("2030-03-15 08:00:00");
    other_plane.plane_code = "VN-ATR72".to_string();

    app.booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();
    let err = app
        .catalog
        .update(&code, other_plane.clone())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    let idle = create_flight(&app, "2030-03-16 08:00:00").await;
    let moved = app.catalog.update(&idle, other_plane).await.unwrap();
    assert_eq!(moved.plane_code, "VN-ATR72");
    assert_eq!(moved.seats.total_seats, 4);
}

#[tokio::test]
async fn delete_is_refused_while_tickets_are_active() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;
    let ticket = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();

    let err = app.catalog.delete(&code).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    app.booking
        .update_status(
            ticket.id,
            flight_booking_backend::entities::ticket::TicketStatus::Cancelled,
        )
        .await
        .unwrap();
    app.catalog.delete(&code).await.unwrap();

    let err = app.catalog.get_by_code(&code).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
    let err = app.booking.get(ticket.id).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn delete_racing_bookings_never_drops_an_active_ticket() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;

    let mut bookings = Vec::new();
    for seat in ["2A", "2B", "2C"] {
        let engine = app.booking.clone();
        let request = ticket_request(&code, seat, BookingType::Ticket);
        bookings.push(tokio::spawn(async move { engine.create(request).await }));
    }
    let catalog = app.catalog.clone();
    let target = code.clone();
    let deletion = tokio::spawn(async move { catalog.delete(&target).await });

    let mut booked = Vec::new();
    for handle in bookings {
        match handle.await.unwrap() {
            Ok(ticket) => booked.push(ticket.id),
            Err(err) => assert_eq!(err.category(), ErrorCategory::NotFound, "{}", err),
        }
    }

    match deletion.await.unwrap() {
        Ok(()) => assert!(booked.is_empty()),
        Err(err) => {
            assert_eq!(err.category(), ErrorCategory::BadRequest, "{}", err);
            assert!(!booked.is_empty());
            for id in booked {
                assert_eq!(
                    app.booking.get(id).await.unwrap().ticket_status,
                    flight_booking_backend::entities::ticket::TicketStatus::Active
                );
            }
        }
    }
}

#[tokio::test]
async fn list_reports_seat_counts_per_flight() {
    let app = setup().await;
    let busy = create_flight(&app, "2030-03-15 08:00:00").await;
    let mut with_stop = flight_request("2030-03-10 08:00:00");
    with_stop.intermediate_stops = vec![stop("DAD", 1, 15)];
    let quiet = app.catalog.create(with_stop).await.unwrap().flight_code;

    for seat in ["1A", "2A"] {
        app.booking
            .create(ticket_request(&busy, seat, BookingType::Ticket))
            .await
            .unwrap();
    }

    let list = app.catalog.list().await.unwrap();
    assert_eq!(list.len(), 2);

    // Ordered by departure.
    assert_eq!(list[0].flight_code, quiet);
    assert_eq!(list[0].stop_count, 1);
    assert_eq!(list[0].seats.booked_seats, 0);

    assert_eq!(list[1].flight_code, busy);
    assert_eq!(list[1].stop_count, 0);
    assert_eq!(list[1].seats.booked_seats, 2);
    assert_eq!(list[1].seats.empty_seats, 8);
}

#[tokio::test]
async fn concurrent_creates_never_share_a_code() {
    let app = setup().await;

    let mut handles = Vec::new();
    for day in 10..16 {
        let catalog = app.catalog.clone();
        handles.push(tokio::spawn(async move {
            catalog
                .create(flight_request(&format!("2030-03-{} 08:00:00", day)))
                .await
        }));
    }

    let mut codes = HashSet::new();
    for handle in handles {
        let flight = handle.await.unwrap().unwrap();
        assert!(codes.insert(flight.flight_code));
    }
    assert_eq!(codes.len(), 6);
    assert!(codes.contains("RuaAirline0006"));
}

#[tokio::test]
async fn parameter_updates_apply_to_later_validations() {
    let app = setup().await;
    let mut request = flight_request("2030-03-15 08:00:00");
    request.intermediate_stops = vec![stop("DAD", 1, 15)];

    app.parameters
        .update(UpdateParametersRequest {
            max_intermediate_stops: Some(0),
            ..Default::default()
        })
        .await
        .unwrap();
    let err = app.catalog.create(request.clone()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    app.parameters
        .update(UpdateParametersRequest {
            max_intermediate_stops: Some(3),
            ..Default::default()
        })
        .await
        .unwrap();
    app.catalog.create(request).await.unwrap();

    let err = app
        .parameters
        .update(UpdateParametersRequest {
            min_intermediate_stop_duration: Some(40),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);
    assert_eq!(app.parameters.current().min_intermediate_stop_duration, 10);
}
