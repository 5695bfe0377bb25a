//! Triage Server
//!
//! HTTP front end for the support ticket classifier. The model is loaded once
//! before the listener binds; if loading fails the service still starts, reports
//! the failure on `/health` and answers `/predict` with 503.

pub mod config;
pub mod health;
pub mod routes;
pub mod service;

pub use config::{Cli, ServerConfig};
pub use health::{HealthReport, HealthStatus};
pub use routes::{create_router, AppState};
pub use service::{ServiceError, TicketService};
