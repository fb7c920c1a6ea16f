use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flight")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub flight_code: String,
    pub plane_id: i32,
    pub departure_airport_id: i32,
    pub arrival_airport_id: i32,
    pub departure_time: DateTimeUtc,
    /// Scheduled duration in minutes.
    pub duration: i32,
    pub base_price: f64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::plane::Entity",
        from = "Column::PlaneId",
        to = "super::plane::Column::Id"
    )]
    Plane,
    #[sea_orm(
        belongs_to = "super::airport::Entity",
        from = "Column::DepartureAirportId",
        to = "super::airport::Column::Id"
    )]
    DepartureAirport,
    #[sea_orm(
        belongs_to = "super::airport::Entity",
        from = "Column::ArrivalAirportId",
        to = "super::airport::Column::Id"
    )]
    ArrivalAirport,
    #[sea_orm(has_many = "super::intermediate_stop::Entity")]
    IntermediateStops,
    #[sea_orm(has_many = "super::ticket::Entity")]
    Tickets,
}

impl Related<super::plane::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plane.def()
    }
}

impl Related<super::intermediate_stop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IntermediateStops.def()
    }
}

impl Related<super::ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tickets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
