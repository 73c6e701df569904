pub mod auth;

pub use auth::Customer;
