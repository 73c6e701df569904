pub mod payment;
pub mod reservations;
pub mod store_owner;
