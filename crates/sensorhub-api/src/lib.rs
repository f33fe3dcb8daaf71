//! # sensorhub-api
//!
//! HTTP layer for SensorHub built on Axum.
//!
//! Exposes the `/ws` upgrade endpoint that feeds the realtime engine, health
//! endpoints under `/api`, request logging and CORS middleware, and the
//! mapping from `AppError` to HTTP responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use state::AppState;
