use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::entities::parameter::{self, GLOBAL_SCOPE};
use crate::error::{AppError, AppResult, StoreContext};

/// Business rules every component validates against. Durations in minutes, windows in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub max_intermediate_stops: i32,
    pub min_intermediate_stop_duration: i32,
    pub max_intermediate_stop_duration: i32,
    pub min_flight_duration: i32,
    pub latest_ticket_purchase_time: i32,
    pub ticket_cancellation_time: i32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            max_intermediate_stops: 2,
            min_intermediate_stop_duration: 10,
            max_intermediate_stop_duration: 20,
            min_flight_duration: 30,
            latest_ticket_purchase_time: 1,
            ticket_cancellation_time: 1,
        }
    }
}

impl From<parameter::Model> for Parameters {
    fn from(row: parameter::Model) -> Self {
        Self {
            max_intermediate_stops: row.max_intermediate_stops,
            min_intermediate_stop_duration: row.min_intermediate_stop_duration,
            max_intermediate_stop_duration: row.max_intermediate_stop_duration,
            min_flight_duration: row.min_flight_duration,
            latest_ticket_purchase_time: row.latest_ticket_purchase_time,
            ticket_cancellation_time: row.ticket_cancellation_time,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> AppResult<()> {
        let non_negative = [
            ("max_intermediate_stops", self.max_intermediate_stops),
            ("min_intermediate_stop_duration", self.min_intermediate_stop_duration),
            ("max_intermediate_stop_duration", self.max_intermediate_stop_duration),
            ("latest_ticket_purchase_time", self.latest_ticket_purchase_time),
            ("ticket_cancellation_time", self.ticket_cancellation_time),
        ];
        if let Some((name, _)) = non_negative.iter().find(|(_, value)| *value < 0) {
            return Err(AppError::BadRequest(format!("{} must not be negative", name)));
        }
        if self.min_flight_duration <= 0 {
            return Err(AppError::BadRequest(
                "min_flight_duration must be positive".to_string(),
            ));
        }
        if self.min_intermediate_stop_duration > self.max_intermediate_stop_duration {
            return Err(AppError::BadRequest(format!(
                "min_intermediate_stop_duration ({}) exceeds max_intermediate_stop_duration ({})",
                self.min_intermediate_stop_duration, self.max_intermediate_stop_duration
            )));
        }
        Ok(())
    }
}

/// Read side handed to components: each operation borrows one consistent snapshot.
pub type ParametersRx = watch::Receiver<Arc<Parameters>>;

pub fn snapshot(rx: &ParametersRx) -> Arc<Parameters> {
    rx.borrow().clone()
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateParametersRequest {
    pub max_intermediate_stops: Option<i32>,
    pub min_intermediate_stop_duration: Option<i32>,
    pub max_intermediate_stop_duration: Option<i32>,
    pub min_flight_duration: Option<i32>,
    pub latest_ticket_purchase_time: Option<i32>,
    pub ticket_cancellation_time: Option<i32>,
}

impl UpdateParametersRequest {
    fn apply_to(&self, current: &Parameters) -> Parameters {
        Parameters {
            max_intermediate_stops: self
                .max_intermediate_stops
                .unwrap_or(current.max_intermediate_stops),
            min_intermediate_stop_duration: self
                .min_intermediate_stop_duration
                .unwrap_or(current.min_intermediate_stop_duration),
            max_intermediate_stop_duration: self
                .max_intermediate_stop_duration
                .unwrap_or(current.max_intermediate_stop_duration),
            min_flight_duration: self.min_flight_duration.unwrap_or(current.min_flight_duration),
            latest_ticket_purchase_time: self
                .latest_ticket_purchase_time
                .unwrap_or(current.latest_ticket_purchase_time),
            ticket_cancellation_time: self
                .ticket_cancellation_time
                .unwrap_or(current.ticket_cancellation_time),
        }
    }
}

#[derive(Clone)]
pub struct ParameterService {
    db: DatabaseConnection,
    tx: Arc<watch::Sender<Arc<Parameters>>>,
}

impl ParameterService {
    pub fn new(db: DatabaseConnection, initial: Parameters) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            db,
            tx: Arc::new(tx),
        }
    }

    /// Reads the singleton row once; later reads go through snapshots.
    pub async fn load(db: DatabaseConnection) -> AppResult<Self> {
        let row = find_row(&db).await?;
        tracing::info!(?row, "Loaded business parameters");
        Ok(Self::new(db, row.into()))
    }

    pub fn subscribe(&self) -> ParametersRx {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Arc<Parameters> {
        self.tx.borrow().clone()
    }

    pub async fn update(&self, request: UpdateParametersRequest) -> AppResult<Parameters> {
        let merged = request.apply_to(&self.current());
        merged.validate()?;

        let row = find_row(&self.db).await?;
        let mut active: parameter::ActiveModel = row.into();
        active.max_intermediate_stops = Set(merged.max_intermediate_stops);
        active.min_intermediate_stop_duration = Set(merged.min_intermediate_stop_duration);
        active.max_intermediate_stop_duration = Set(merged.max_intermediate_stop_duration);
        active.min_flight_duration = Set(merged.min_flight_duration);
        active.latest_ticket_purchase_time = Set(merged.latest_ticket_purchase_time);
        active.ticket_cancellation_time = Set(merged.ticket_cancellation_time);
        let saved: Parameters = active
            .update(&self.db)
            .await
            .context("failed to update parameters")?
            .into();

        self.tx.send_replace(Arc::new(saved.clone()));
        tracing::info!(parameters = ?saved, "Business parameters updated");
        Ok(saved)
    }
}

async fn find_row(db: &DatabaseConnection) -> AppResult<parameter::Model> {
    parameter::Entity::find()
        .filter(parameter::Column::Scope.eq(GLOBAL_SCOPE))
        .one(db)
        .await
        .context("failed to load parameters")?
        .ok_or_else(|| AppError::internal("parameter row is missing; run migrations"))
}
