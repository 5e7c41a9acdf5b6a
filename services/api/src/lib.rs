//! Kids Learning API Library Crate
//!
//! Hosts learning sessions over WebSockets: configuration, shared state,
//! routing and the per-connection session loop. The `api` binary is a thin
//! wrapper around this library.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod ws;
