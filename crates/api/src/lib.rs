//! hostwatch API server library.
//!
//! Exposes configuration, state, error handling, the route tree and the
//! background scheduler so integration tests and the binary entrypoint can
//! both access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
