use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;

use crate::entities::ticket::TicketStatus;
use crate::entities::{flight, ticket};
use crate::error::{AppError, AppResult, StoreContext};
use crate::services::inventory;
use crate::utils::time::month_window;

#[derive(Debug, Clone, Serialize)]
pub struct FlightRevenue {
    pub flight_code: String,
    pub departure_time: DateTime<Utc>,
    pub tickets_sold: i64,
    pub total_seats: i64,
    pub revenue: f64,
    /// Percentage of seats held by active tickets.
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub flights: Vec<FlightRevenue>,
    pub total_revenue: f64,
    pub total_tickets: i64,
    pub average_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthRevenue {
    pub month: u32,
    pub flight_count: i64,
    pub revenue: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearlyReport {
    pub year: i32,
    pub months: Vec<MonthRevenue>,
    pub total_revenue: f64,
    pub total_flights: i64,
    pub average_ratio: f64,
}

pub fn fill_ratio(booked: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    booked as f64 / total as f64 * 100.0
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

#[derive(Clone)]
pub struct RevenueReporter {
    db: DatabaseConnection,
    tz: Tz,
}

impl RevenueReporter {
    pub fn new(db: DatabaseConnection, tz: Tz) -> Self {
        Self { db, tz }
    }

    pub async fn monthly(&self, year: i32, month: u32) -> AppResult<MonthlyReport> {
        let (start, end) = month_window(year, month, self.tz)?;

        let flights = flight::Entity::find()
            .filter(flight::Column::DepartureTime.gte(start))
            .filter(flight::Column::DepartureTime.lt(end))
            .order_by_asc(flight::Column::DepartureTime)
            .order_by_asc(flight::Column::Id)
            .all(&self.db)
            .await
            .context("failed to load flights for the month")?;

        if flights.is_empty() {
            return Ok(MonthlyReport {
                year,
                month,
                flights: Vec::new(),
                total_revenue: 0.0,
                total_tickets: 0,
                average_ratio: 0.0,
            });
        }

        let counts = inventory::seat_counts_batch(&self.db, &flights).await?;
        let flight_ids: Vec<i32> = flights.iter().map(|f| f.id).collect();
        let revenue: HashMap<i32, f64> = ticket::Entity::find()
            .select_only()
            .column(ticket::Column::FlightId)
            .column_as(ticket::Column::Price.sum(), "revenue")
            .filter(ticket::Column::FlightId.is_in(flight_ids))
            .filter(ticket::Column::TicketStatus.eq(TicketStatus::Active))
            .group_by(ticket::Column::FlightId)
            .into_tuple::<(i32, Option<f64>)>()
            .all(&self.db)
            .await
            .context("failed to sum ticket revenue")?
            .into_iter()
            .map(|(id, sum)| (id, sum.unwrap_or(0.0)))
            .collect();

        let rows = flights
            .into_iter()
            .map(|f| -> AppResult<FlightRevenue> {
                let seats = counts.get(&f.id).copied().ok_or_else(|| {
                    AppError::internal(format!("missing seat counts for {}", f.flight_code))
                })?;
                Ok(FlightRevenue {
                    revenue: revenue.get(&f.id).copied().unwrap_or(0.0),
                    tickets_sold: seats.booked_seats,
                    total_seats: seats.total_seats,
                    ratio: fill_ratio(seats.booked_seats, seats.total_seats),
                    flight_code: f.flight_code,
                    departure_time: f.departure_time,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(MonthlyReport {
            year,
            month,
            total_revenue: rows.iter().map(|r| r.revenue).sum(),
            total_tickets: rows.iter().map(|r| r.tickets_sold).sum(),
            average_ratio: mean(rows.iter().map(|r| r.ratio)),
            flights: rows,
        })
    }

    /// Months without flights are left out of both the listing and the average.
    pub async fn yearly(&self, year: i32) -> AppResult<YearlyReport> {
        if !(1..=9999).contains(&year) {
            return Err(AppError::BadRequest(format!(
                "year must be between 1 and 9999, got {}",
                year
            )));
        }

        let mut months = Vec::new();
        for month in 1..=12 {
            let report = self.monthly(year, month).await?;
            if report.flights.is_empty() {
                continue;
            }
            months.push(MonthRevenue {
                month,
                flight_count: report.flights.len() as i64,
                revenue: report.total_revenue,
                ratio: report.average_ratio,
            });
        }

        Ok(YearlyReport {
            year,
            total_revenue: months.iter().map(|m| m.revenue).sum(),
            total_flights: months.iter().map(|m| m.flight_count).sum(),
            average_ratio: mean(months.iter().map(|m| m.ratio)),
            months,
        })
    }
}
