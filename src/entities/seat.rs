use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seat")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub plane_id: i32,
    pub seat_number: String,
    pub ticket_class_id: i32,
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
        belongs_to = "super::ticket_class::Entity",
        from = "Column::TicketClassId",
        to = "super::ticket_class::Column::Id"
    )]
    TicketClass,
    #[sea_orm(has_many = "super::ticket::Entity")]
    Tickets,
}

impl Related<super::plane::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Plane.def()
    }
}

impl Related<super::ticket_class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TicketClass.def()
    }
}

impl Related<super::ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tickets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
