//! Axum HTTP API server.
//!
//! This crate provides:
//! - JSON routes over every ad assembly operation
//! - Readiness probes for the backing stores
//! - Request ids, logging, CORS and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, Backend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, ReadinessCheck};
