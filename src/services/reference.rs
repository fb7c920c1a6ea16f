//! Read paths over airports, planes and ticket classes. These are loaded by
//! migration or administrative import and never written by the booking flow.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;

use crate::entities::{airport, plane, seat, ticket_class};
use crate::error::{AppError, AppResult, StoreContext};

#[derive(Debug, Clone, Serialize)]
pub struct PlaneSummary {
    pub plane_code: String,
    pub plane_name: String,
    pub total_seats: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub seat_number: String,
    pub class_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaneDetail {
    pub plane_code: String,
    pub plane_name: String,
    pub seats: Vec<SeatView>,
}

#[derive(Clone)]
pub struct ReferenceData {
    db: DatabaseConnection,
}

impl ReferenceData {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn airports(&self) -> AppResult<Vec<airport::Model>> {
        airport::Entity::find()
            .order_by_asc(airport::Column::AirportCode)
            .all(&self.db)
            .await
            .context("failed to list airports")
    }

    pub async fn airport(&self, code: &str) -> AppResult<airport::Model> {
        airport::Entity::find()
            .filter(airport::Column::AirportCode.eq(code))
            .one(&self.db)
            .await
            .context("failed to load airport")?
            .ok_or_else(|| AppError::not_found("airport", code))
    }

    pub async fn planes(&self) -> AppResult<Vec<PlaneSummary>> {
        let planes = plane::Entity::find()
            .order_by_asc(plane::Column::PlaneCode)
            .all(&self.db)
            .await
            .context("failed to list planes")?;

        let seat_counts: HashMap<i32, i64> = seat::Entity::find()
            .select_only()
            .column(seat::Column::PlaneId)
            .column_as(seat::Column::Id.count(), "seats")
            .group_by(seat::Column::PlaneId)
            .into_tuple::<(i32, i64)>()
            .all(&self.db)
            .await
            .context("failed to count plane seats")?
            .into_iter()
            .collect();

        Ok(planes
            .into_iter()
            .map(|p| PlaneSummary {
                total_seats: seat_counts.get(&p.id).copied().unwrap_or(0),
                plane_code: p.plane_code,
                plane_name: p.plane_name,
            })
            .collect())
    }

    pub async fn plane(&self, code: &str) -> AppResult<PlaneDetail> {
        let plane = plane::Entity::find()
            .filter(plane::Column::PlaneCode.eq(code))
            .one(&self.db)
            .await
            .context("failed to load plane")?
            .ok_or_else(|| AppError::not_found("plane", code))?;

        let seats = seat::Entity::find()
            .filter(seat::Column::PlaneId.eq(plane.id))
            .find_also_related(ticket_class::Entity)
            .order_by_asc(seat::Column::Id)
            .all(&self.db)
            .await
            .context("failed to load plane seats")?
            .into_iter()
            .map(|(s, class)| -> AppResult<SeatView> {
                let class = class.ok_or_else(|| {
                    AppError::internal(format!("seat {} has no ticket class", s.seat_number))
                })?;
                Ok(SeatView {
                    seat_number: s.seat_number,
                    class_name: class.class_name,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PlaneDetail {
            plane_code: plane.plane_code,
            plane_name: plane.plane_name,
            seats,
        })
    }

    pub async fn ticket_classes(&self) -> AppResult<Vec<ticket_class::Model>> {
        ticket_class::Entity::find()
            .order_by_asc(ticket_class::Column::Id)
            .all(&self.db)
            .await
            .context("failed to list ticket classes")
    }
}
