use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Key of the single parameter row.
pub const GLOBAL_SCOPE: &str = "global";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parameter")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub scope: String,
    pub max_intermediate_stops: i32,
    pub min_intermediate_stop_duration: i32,
    pub max_intermediate_stop_duration: i32,
    pub min_flight_duration: i32,
    /// Days before departure after which place-orders can no longer be made or converted.
    pub latest_ticket_purchase_time: i32,
    /// Days before departure after which tickets can no longer be cancelled.
    pub ticket_cancellation_time: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
