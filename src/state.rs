use std::sync::Arc;

use crate::cart::GuestCart;
use crate::database::Database;
use crate::services::{Notifier, PaymentGateway};

/// Shared application state. Every collaborator is injected here once at
/// startup; nothing reads process-wide globals.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cart: GuestCart,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Notifier,
}
