pub mod flights;
pub mod parameters;
pub mod reference;
pub mod reports;
pub mod tickets;
