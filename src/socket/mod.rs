//! Unix socket server module.
//!
//! Handles Unix socket listening and per-connection sessions.

mod connection;
mod listener;

pub use connection::{handle_connection, serve_session, REPLY_FAILED, REPLY_UNSUPPORTED};
pub use listener::{ConnectionMetrics, RouterFactory, SocketListener};
