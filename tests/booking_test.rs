mod common;

use chrono::Duration;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use flight_booking_backend::entities::ticket::{BookingType, TicketStatus};
use flight_booking_backend::entities::{ticket, ticket_class};
use flight_booking_backend::error::{ErrorCategory, StoreContext};

use common::{create_flight, setup, ticket_request, utc};

/// Local 2030-03-15 08:00 in Asia/Ho_Chi_Minh.
fn departure() -> chrono::DateTime<chrono::Utc> {
    utc(2030, 3, 15, 1, 0, 0)
}

#[tokio::test]
async fn price_is_a_snapshot_of_base_times_multiplier() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;

    let business = app
        .booking
        .create(ticket_request(&code, "1A", BookingType::Ticket))
        .await
        .unwrap();
    assert_eq!(business.price, 150.0);
    assert_eq!(business.class_name, "Business");
    assert_eq!(business.ticket_status, TicketStatus::Active);

    let class = ticket_class::Entity::find()
        .filter(ticket_class::Column::ClassName.eq("Business"))
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let mut repriced: ticket_class::ActiveModel = class.into();
    repriced.price_multiplier = Set(3.0);
    repriced.update(&app.db).await.unwrap();

    assert_eq!(app.booking.get(business.id).await.unwrap().price, 150.0);
    let later = app
        .booking
        .create(ticket_request(&code, "1B", BookingType::Ticket))
        .await
        .unwrap();
    assert_eq!(later.price, 300.0);
}

#[tokio::test]
async fn concurrent_bookings_for_one_seat_yield_one_holder() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = app.booking.clone();
        let request = ticket_request(&code, "2C", BookingType::Ticket);
        handles.push(tokio::spawn(async move { engine.create(request).await }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => {
                assert_eq!(err.category(), ErrorCategory::Conflict, "{}", err);
                conflicts += 1;
            }
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);

    let holders = ticket::Entity::find()
        .filter(ticket::Column::TicketStatus.is_in(TicketStatus::SEAT_HOLDING))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(holders.len(), 1);
}

#[tokio::test]
async fn store_rejects_a_second_holder_as_a_conflict() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;
    let held = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();
    let existing = ticket::Entity::find_by_id(held.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();

    // Skips the holder pre-check, so only the partial unique index can refuse it.
    let mut duplicate: ticket::ActiveModel = existing.clone().into();
    duplicate.id = Set(uuid::Uuid::new_v4());
    let err = duplicate
        .insert(&app.db)
        .await
        .or_conflict("failed to insert ticket", || format!("seat 2A on {} is taken", code))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);
    assert_eq!(err.to_string(), format!("seat 2A on {} is taken", code));

    // A released seat can hold a new ticket alongside the old record.
    let mut released: ticket::ActiveModel = existing.into();
    released.id = Set(uuid::Uuid::new_v4());
    released.ticket_status = Set(TicketStatus::Cancelled);
    released.insert(&app.db).await.unwrap();
}

#[tokio::test]
async fn cancelled_seat_can_be_booked_again() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;

    let first = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();
    let err = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::PlaceOrder))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);

    app.booking
        .update_status(first.id, TicketStatus::Cancelled)
        .await
        .unwrap();
    app.booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();
}

#[tokio::test]
async fn create_checks_flight_and_seat() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;

    let err = app
        .booking
        .create(ticket_request("RuaAirline0404", "2A", BookingType::Ticket))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    // 1C only exists on the ATR.
    let err = app
        .booking
        .create(ticket_request(&code, "1C", BookingType::Ticket))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    let mut blank = ticket_request(&code, "2A", BookingType::Ticket);
    blank.full_name = "  ".to_string();
    let err = app.booking.create(blank).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    app.clock.set(departure() + Duration::minutes(1));
    let err = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);
}

#[tokio::test]
async fn place_order_deadline_is_inclusive() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;
    let deadline = departure() - Duration::days(1);

    app.clock.set(deadline);
    app.booking
        .create(ticket_request(&code, "2A", BookingType::PlaceOrder))
        .await
        .unwrap();

    app.clock.set(deadline + Duration::seconds(1));
    let err = app
        .booking
        .create(ticket_request(&code, "2B", BookingType::PlaceOrder))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    // Confirmed tickets are not bound by the place-order window.
    app.booking
        .create(ticket_request(&code, "2B", BookingType::Ticket))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancellation_deadline_is_inclusive() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;
    let deadline = departure() - Duration::days(1);

    let on_time = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();
    let too_late = app
        .booking
        .create(ticket_request(&code, "2B", BookingType::Ticket))
        .await
        .unwrap();

    app.clock.set(deadline);
    let cancelled = app
        .booking
        .update_status(on_time.id, TicketStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.ticket_status, TicketStatus::Cancelled);

    app.clock.set(deadline + Duration::seconds(1));
    let err = app
        .booking
        .update_status(too_late.id, TicketStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);
    assert_eq!(
        app.booking.get(too_late.id).await.unwrap().ticket_status,
        TicketStatus::Active
    );
}

#[tokio::test]
async fn used_and_cancelled_tickets_cannot_be_cancelled() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;
    let used = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();
    let cancelled = app
        .booking
        .create(ticket_request(&code, "2B", BookingType::Ticket))
        .await
        .unwrap();

    app.booking.update_status(used.id, TicketStatus::Used).await.unwrap();
    let err = app
        .booking
        .update_status(used.id, TicketStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);
    assert_eq!(err.to_string(), "cannot cancel a used ticket");

    app.booking
        .update_status(cancelled.id, TicketStatus::Cancelled)
        .await
        .unwrap();
    let err = app
        .booking
        .update_status(cancelled.id, TicketStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "ticket is already cancelled");

    let refunded = app
        .booking
        .update_status(cancelled.id, TicketStatus::Refunded)
        .await
        .unwrap();
    assert_eq!(refunded.ticket_status, TicketStatus::Refunded);
}

#[tokio::test]
async fn reactivation_needs_a_free_seat() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;
    let original = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();
    app.booking
        .update_status(original.id, TicketStatus::Cancelled)
        .await
        .unwrap();

    let replacement = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();
    let err = app
        .booking
        .update_status(original.id, TicketStatus::Active)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);

    app.booking
        .update_status(replacement.id, TicketStatus::Cancelled)
        .await
        .unwrap();
    let back = app
        .booking
        .update_status(original.id, TicketStatus::Active)
        .await
        .unwrap();
    assert_eq!(back.ticket_status, TicketStatus::Active);
}

#[tokio::test]
async fn place_orders_convert_within_the_purchase_window() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;

    let order = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::PlaceOrder))
        .await
        .unwrap();
    let late_order = app
        .booking
        .create(ticket_request(&code, "2B", BookingType::PlaceOrder))
        .await
        .unwrap();
    let confirmed = app
        .booking
        .create(ticket_request(&code, "2C", BookingType::Ticket))
        .await
        .unwrap();

    let err = app
        .booking
        .convert_place_order(confirmed.id)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    let converted = app.booking.convert_place_order(order.id).await.unwrap();
    assert_eq!(converted.booking_type, BookingType::Ticket);
    assert_eq!(converted.ticket_status, TicketStatus::Active);
    assert_eq!(converted.price, order.price);

    app.clock.set(departure() - Duration::hours(12));
    let err = app
        .booking
        .convert_place_order(late_order.id)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::BadRequest);

    let err = app
        .booking
        .convert_place_order(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn cancel_place_orders_expires_every_place_order_of_the_flight() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;
    let other = create_flight(&app, "2030-03-16 08:00:00").await;

    let held = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::PlaceOrder))
        .await
        .unwrap();
    let released = app
        .booking
        .create(ticket_request(&code, "2B", BookingType::PlaceOrder))
        .await
        .unwrap();
    app.booking
        .update_status(released.id, TicketStatus::Cancelled)
        .await
        .unwrap();
    let confirmed = app
        .booking
        .create(ticket_request(&code, "2C", BookingType::Ticket))
        .await
        .unwrap();
    let elsewhere = app
        .booking
        .create(ticket_request(&other, "2A", BookingType::PlaceOrder))
        .await
        .unwrap();

    let expired = app.booking.cancel_place_orders(&code).await.unwrap();
    assert_eq!(expired, 2);

    let status = |id: uuid::Uuid| {
        let booking = app.booking.clone();
        async move { booking.get(id).await.unwrap().ticket_status }
    };
    assert_eq!(status(held.id).await, TicketStatus::Expired);
    assert_eq!(status(released.id).await, TicketStatus::Expired);
    assert_eq!(status(confirmed.id).await, TicketStatus::Active);
    assert_eq!(status(elsewhere.id).await, TicketStatus::Active);

    let err = app
        .booking
        .cancel_place_orders("RuaAirline0404")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn delete_removes_the_ticket_once() {
    let app = setup().await;
    let code = create_flight(&app, "2030-03-15 08:00:00").await;
    let ticket = app
        .booking
        .create(ticket_request(&code, "2A", BookingType::Ticket))
        .await
        .unwrap();

    app.booking.delete(ticket.id).await.unwrap();
    let err = app.booking.delete(ticket.id).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
    assert!(app.booking.list_for_flight(&code).await.unwrap().is_empty());
}

#[tokio::test]
async fn listings_cover_all_tickets_and_per_flight() {
    let app = setup().await;
    let first = create_flight(&app, "2030-03-15 08:00:00").await;
    let second = create_flight(&app, "2030-03-16 08:00:00").await;

    for (code, seat) in [(&first, "2A"), (&first, "2B"), (&second, "1A")] {
        app.booking
            .create(ticket_request(code, seat, BookingType::Ticket))
            .await
            .unwrap();
    }

    assert_eq!(app.booking.list_all().await.unwrap().len(), 3);
    let on_first = app.booking.list_for_flight(&first).await.unwrap();
    assert_eq!(on_first.len(), 2);
    assert!(on_first.iter().all(|t| t.flight_code == first));

    assert_eq!(app.booking.statuses().len(), 5);
    assert_eq!(
        app.booking.booking_types(),
        vec![BookingType::Ticket, BookingType::PlaceOrder]
    );
}
