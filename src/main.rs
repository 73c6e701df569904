mod cart;
mod database;
mod error;
mod handlers;
mod inventory;
mod middleware;
mod models;
mod services;
mod state;
mod utils;
mod window;

use std::env;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use cart::GuestCart;
use database::create_database_pool;
use services::{Notifier, StripeGateway};
use state::AppState;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    // Initialize database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Database connection successful!");

    let payments = StripeGateway::from_env().expect("Failed to build payment gateway client");

    let state = AppState {
        db,
        cart: GuestCart::new(),
        payments: Arc::new(payments),
        notifier: Notifier::from_env(),
    };

    // Build the application router
    let app = create_router(state);

    // Get port from environment or use default
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    println!("🚀 lastbag server starting on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // Customer reservations (bearer auth)
        .route("/reservations", post(handlers::reservations::create_reservation))
        .route("/reservations", get(handlers::reservations::list_reservations))
        .route("/reservations/:id", delete(handlers::reservations::delete_reservation))
        // Guest reservations (session cookie)
        .route("/reservations/guest", post(handlers::reservations::create_guest_reservation))
        .route("/reservations/guest", get(handlers::reservations::list_guest_reservations))
        .route("/reservations/guest/:id", delete(handlers::reservations::delete_guest_reservation))
        // Store owner
        .route("/store-owner/reservations", get(handlers::store_owner::list_store_reservations))
        .route("/store-owner/reservations/:id/status", put(handlers::store_owner::update_reservation_status))
        // Payments
        .route("/payment/intent", post(handlers::payment::create_payment_intent))
        .route("/payment/confirm", post(handlers::payment::confirm_payment))
        .route("/payment/confirm-pay-at-store", post(handlers::payment::confirm_pay_at_store))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
