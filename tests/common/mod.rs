#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use flight_booking_backend::entities::ticket::BookingType;
use flight_booking_backend::entities::{airport, plane, seat, ticket_class};
use flight_booking_backend::services::booking::{BookingEngine, CreateTicketRequest};
use flight_booking_backend::services::catalog::{FlightCatalog, FlightRequest, StopRequest};
use flight_booking_backend::services::parameters::ParameterService;
use flight_booking_backend::services::reference::ReferenceData;
use flight_booking_backend::services::revenue::RevenueReporter;
use flight_booking_backend::utils::clock::{ManualClock, SharedClock};

pub const TZ: Tz = chrono_tz::Asia::Ho_Chi_Minh;

/// Business seats on VN-A321; the other eight are economy.
pub const BUSINESS_SEATS: [&str; 2] = ["1A", "1B"];
pub const ECONOMY_SEATS: [&str; 8] = ["2A", "2B", "2C", "2D", "3A", "3B", "3C", "3D"];

pub struct TestApp {
    pub db: DatabaseConnection,
    pub clock: Arc<ManualClock>,
    pub parameters: ParameterService,
    pub catalog: FlightCatalog,
    pub booking: BookingEngine,
    pub revenue: RevenueReporter,
    pub reference: ReferenceData,
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// 2030-01-01 00:00 UTC, well before every seeded departure.
pub fn start() -> DateTime<Utc> {
    utc(2030, 1, 1, 0, 0, 0)
}

pub async fn setup() -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    seed(&db).await;

    let clock = Arc::new(ManualClock::new(start()));
    let shared: SharedClock = clock.clone();
    let parameters = ParameterService::load(db.clone()).await.unwrap();

    TestApp {
        catalog: FlightCatalog::new(db.clone(), shared.clone(), parameters.subscribe(), TZ),
        booking: BookingEngine::new(db.clone(), shared, parameters.subscribe()),
        revenue: RevenueReporter::new(db.clone(), TZ),
        reference: ReferenceData::new(db.clone()),
        db,
        clock,
        parameters,
    }
}

async fn seed(db: &DatabaseConnection) {
    for (code, name, city) in [
        ("SGN", "Tan Son Nhat", "Ho Chi Minh City"),
        ("HAN", "Noi Bai", "Ha Noi"),
        ("DAD", "Da Nang", "Da Nang"),
        ("HUI", "Phu Bai", "Hue"),
        ("CXR", "Cam Ranh", "Nha Trang"),
    ] {
        airport::ActiveModel {
            airport_code: Set(code.to_string()),
            airport_name: Set(name.to_string()),
            city_name: Set(city.to_string()),
            country_name: Set("Viet Nam".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    let economy = ticket_class::ActiveModel {
        class_name: Set("Economy".to_string()),
        price_multiplier: Set(1.0),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    let business = ticket_class::ActiveModel {
        class_name: Set("Business".to_string()),
        price_multiplier: Set(1.5),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    let a321 = insert_plane(db, "VN-A321", "Airbus A321").await;
    for number in BUSINESS_SEATS {
        insert_seat(db, a321.id, number, business.id).await;
    }
    for number in ECONOMY_SEATS {
        insert_seat(db, a321.id, number, economy.id).await;
    }

    let atr = insert_plane(db, "VN-ATR72", "ATR 72").await;
    for number in ["1A", "1B", "1C", "1D"] {
        insert_seat(db, atr.id, number, economy.id).await;
    }

    insert_plane(db, "VN-FERRY", "Ferry flight, no cabin").await;
}

async fn insert_plane(db: &DatabaseConnection, code: &str, name: &str) -> plane::Model {
    plane::ActiveModel {
        plane_code: Set(code.to_string()),
        plane_name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_seat(db: &DatabaseConnection, plane_id: i32, number: &str, class_id: i32) {
    seat::ActiveModel {
        plane_id: Set(plane_id),
        seat_number: Set(number.to_string()),
        ticket_class_id: Set(class_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

/// SGN -> HAN on the A321, base price 100.0, departure in local time.
pub fn flight_request(departure: &str) -> FlightRequest {
    FlightRequest {
        plane_code: "VN-A321".to_string(),
        departure_airport_code: "SGN".to_string(),
        arrival_airport_code: "HAN".to_string(),
        departure_time: departure.to_string(),
        duration: 120,
        base_price: 100.0,
        intermediate_stops: Vec::new(),
    }
}

pub fn stop(code: &str, order: i32, duration: i32) -> StopRequest {
    StopRequest {
        airport_code: code.to_string(),
        stop_order: order,
        stop_duration: duration,
        note: None,
    }
}

pub fn ticket_request(flight_code: &str, seat: &str, booking_type: BookingType) -> CreateTicketRequest {
    CreateTicketRequest {
        flight_code: flight_code.to_string(),
        seat_number: seat.to_string(),
        full_name: format!("Passenger {}", seat),
        id_card: format!("079{}", seat),
        phone_number: "0900000000".to_string(),
        email: "passenger@example.com".to_string(),
        booking_type,
    }
}

/// Creates a flight departing at `departure` (local time) and returns its code.
pub async fn create_flight(app: &TestApp, departure: &str) -> String {
    app.catalog
        .create(flight_request(departure))
        .await
        .unwrap()
        .flight_code
}
