pub mod airport;
pub mod flight;
pub mod intermediate_stop;
pub mod parameter;
pub mod plane;
pub mod seat;
pub mod ticket;
pub mod ticket_class;
