//! WebSocket Session Management
//!
//! One WebSocket connection drives one learning session:
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `dispatch`: Maps client messages onto session operations and renders the results.
//! - `session`: Manages the connection lifecycle and the in-flight content fetches.

pub mod dispatch;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
