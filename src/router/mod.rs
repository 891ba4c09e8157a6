//! Command router module.
//!
//! Routes `"<command>: <payload>"` messages to registered handlers.
//!
//! ## Adding a Handler
//!
//! 1. Write a closure `|payload: &str| -> HandlerResult`, or implement `Handler`
//! 2. Register it with `CommandRouter::register` (or `try_register` to validate)
//! 3. Use `register_responder` instead when the handler answers with a `Reply`
//! 4. Feed raw messages to `CommandRouter::dispatch`

mod registry;
mod traits;
mod types;

pub use registry::CommandRouter;
pub use traits::{Handler, HandlerResult, ReplyResult};
pub use types::{Outcome, Reply, UnknownCommandPolicy};
