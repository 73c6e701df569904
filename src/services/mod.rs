pub mod notifications;
pub mod payments;

pub use notifications::{Notifier, ReservationSummary};
pub use payments::{PaymentGateway, StripeGateway};
