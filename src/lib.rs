pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::booking::BookingEngine;
use services::catalog::FlightCatalog;
use services::parameters::ParameterService;
use services::reference::ReferenceData;
use services::revenue::RevenueReporter;
use utils::clock::SharedClock;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub clock: SharedClock,
    pub parameters: ParameterService,
    pub catalog: FlightCatalog,
    pub booking: BookingEngine,
    pub revenue: RevenueReporter,
    pub reference: ReferenceData,
}

impl AppState {
    /// Wires every component against one store, one clock and one parameter feed.
    pub fn new(
        db: DatabaseConnection,
        config: Config,
        clock: SharedClock,
        parameters: ParameterService,
    ) -> Self {
        let tz = config.timezone;
        Self {
            catalog: FlightCatalog::new(db.clone(), clock.clone(), parameters.subscribe(), tz),
            booking: BookingEngine::new(db.clone(), clock.clone(), parameters.subscribe()),
            revenue: RevenueReporter::new(db.clone(), tz),
            reference: ReferenceData::new(db),
            parameters,
            clock,
            config,
        }
    }
}
