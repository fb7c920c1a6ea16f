pub mod booking;
pub mod catalog;
pub mod inventory;
pub mod parameters;
pub mod reference;
pub mod revenue;
pub mod scheduler;
