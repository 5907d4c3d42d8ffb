//! Pong Arena tournament API server.
//!
//! Thin HTTP layer over the `pong_arena` bracket engine: REST endpoints
//! for tournament creation, result submission, and bracket/standings
//! reads, backed by PostgreSQL or the in-memory store.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
