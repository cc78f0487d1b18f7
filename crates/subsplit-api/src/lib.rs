//! Webhook intake server for the subsplit publisher.
//!
//! Accepts push hooks over HTTP and enqueues them untouched; the worker
//! does all of the interpretation.

pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use state::AppState;
