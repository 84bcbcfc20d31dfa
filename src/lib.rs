//! Library entry point for the TruthLens backend.
//!
//! Exports all core modules for use in integration tests and by the main binary.

pub mod auth_middleware;
pub mod config;
pub mod db;
pub mod email;
pub mod handlers;
pub mod models;
pub mod reputation;
pub mod services;
pub mod telemetry;

pub use auth_middleware::*;
pub use config::Settings;
pub use db::*;
pub use handlers::configure_routes;
pub use models::AppState;
pub use services::SupabaseService;
pub use telemetry::{get_subscriber, init_subscriber};
