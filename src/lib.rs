//! # Kitsu Backend Library
//!
//! HTTP backend for the Kitsu anime catalog and user data. Every response,
//! successful or not, uses one JSON envelope (`data` / `meta` / `error`), and
//! every failure goes through one error translation.
//!
//! ## Architecture
//!
//! - **Axum**: routing, extractors and middleware
//! - **SQLx**: asynchronous SQLite access and migrations
//! - **Tokio**: async runtime
//! - **Tracing**: structured logs with a per-request span
//!
//! ## Core Components
//!
//! - [`config`]: settings loaded once from defaults, files and the environment
//! - [`db`]: connection pool and versioned migrations
//! - [`error`]: error taxonomy and translation to HTTP responses
//! - [`extract`]: extractors whose failures become envelope errors
//! - [`logging`]: tracing subscriber setup
//! - [`middleware`]: request-ID propagation and error logging
//! - [`repositories`]: read queries with soft-delete and publication filters
//! - [`response`]: the response envelope
//! - [`routes`]: HTTP handlers
//! - [`server`]: middleware stack, listener and shutdown
//! - [`state`]: shared application state
//! - [`types`]: request parameters and response DTOs

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod middleware;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
