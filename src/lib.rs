//! cmdwire
//!
//! Routes text messages of the form `"<command>: <payload>"` to handlers
//! registered per command, and serves them over a Unix socket with one
//! message per line.
//!
//! ```
//! use cmdwire::router::{CommandRouter, Outcome};
//!
//! let mut router = CommandRouter::new();
//! router.register("MOVE", |payload: &str| {
//!     assert_eq!(payload, "10: 20");
//!     Ok(())
//! });
//!
//! assert_eq!(router.dispatch("MOVE: 10: 20").unwrap(), Outcome::Handled);
//! assert_eq!(router.dispatch("hello world").unwrap(), Outcome::Malformed);
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod router;
pub mod socket;
