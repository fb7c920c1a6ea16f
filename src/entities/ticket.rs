use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingType {
    #[sea_orm(string_value = "TICKET")]
    Ticket,
    #[sea_orm(string_value = "PLACE_ORDER")]
    PlaceOrder,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "USED")]
    Used,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

impl TicketStatus {
    /// Statuses that occupy the seat on the flight.
    pub const SEAT_HOLDING: [TicketStatus; 2] = [TicketStatus::Active, TicketStatus::Used];

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Active => "ACTIVE",
            TicketStatus::Used => "USED",
            TicketStatus::Cancelled => "CANCELLED",
            TicketStatus::Expired => "EXPIRED",
            TicketStatus::Refunded => "REFUNDED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub flight_id: i32,
    pub seat_id: i32,
    pub full_name: String,
    pub id_card: String,
    pub phone_number: String,
    pub email: String,
    /// Snapshot taken at booking time; later class or fare changes do not affect it.
    pub price: f64,
    pub booking_type: BookingType,
    pub ticket_status: TicketStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::flight::Entity",
        from = "Column::FlightId",
        to = "super::flight::Column::Id"
    )]
    Flight,
    #[sea_orm(
        belongs_to = "super::seat::Entity",
        from = "Column::SeatId",
        to = "super::seat::Column::Id"
    )]
    Seat,
}

impl Related<super::flight::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flight.def()
    }
}

impl Related<super::seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
