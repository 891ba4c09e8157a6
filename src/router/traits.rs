//! Handler trait definition.

use crate::error::HandlerError;

use super::types::Reply;

/// Result returned by a handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Result returned by a handler that may answer the sender.
pub type ReplyResult = Result<Option<Reply>, HandlerError>;

/// Something that can receive the payload of a routed message.
///
/// Closures of the form `Fn(&str) -> HandlerResult` implement this trait, so
/// most handlers never need a named type. Handlers that answer override
/// [`respond`](Handler::respond); the router always calls `respond`.
///
/// # Example
///
/// ```
/// use cmdwire::router::{CommandRouter, Handler, HandlerResult};
///
/// struct Greeter;
///
/// impl Handler for Greeter {
///     fn handle(&self, payload: &str) -> HandlerResult {
///         println!("hello, {}", payload);
///         Ok(())
///     }
/// }
///
/// let mut router = CommandRouter::new();
/// router.register_handler("greet", Greeter);
/// router.dispatch("greet: world").unwrap();
/// ```
pub trait Handler: Send + Sync {
    /// Process the payload of a message addressed to this handler.
    fn handle(&self, payload: &str) -> HandlerResult;

    /// Process the payload and optionally produce a reply for the sender.
    fn respond(&self, payload: &str) -> ReplyResult {
        self.handle(payload).map(|()| None)
    }
}

impl<F> Handler for F
where
    F: Fn(&str) -> HandlerResult + Send + Sync,
{
    fn handle(&self, payload: &str) -> HandlerResult {
        self(payload)
    }
}

/// Adapts a replying closure to [`Handler`].
pub(crate) struct Responder<F>(pub(crate) F);

impl<F> Handler for Responder<F>
where
    F: Fn(&str) -> ReplyResult + Send + Sync,
{
    fn handle(&self, payload: &str) -> HandlerResult {
        (self.0)(payload).map(|_| ())
    }

    fn respond(&self, payload: &str) -> ReplyResult {
        (self.0)(payload)
    }
}
