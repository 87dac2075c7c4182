pub mod admin;
pub mod auth;
pub mod employees;
pub mod fleet;
pub mod payments;
pub mod relay;
pub mod reservations;
pub mod root;
pub mod tickets;
pub mod trips;
