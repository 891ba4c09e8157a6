//! Command router for dispatching messages to handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{CommandErrorKind, WireError};
use crate::protocol::{validate_command, Message, CONTROL_COMMAND};

use super::traits::{Handler, HandlerResult, ReplyResult, Responder};
use super::types::{Outcome, Reply, UnknownCommandPolicy};

/// Maps command names to handlers and routes raw messages to them.
///
/// A router is owned by whoever reads the connection. It is not synchronized
/// internally; register everything before dispatching.
#[derive(Clone, Default)]
pub struct CommandRouter {
    handlers: HashMap<String, Arc<dyn Handler>>,
    open: Option<Arc<dyn Handler>>,
    unknown_commands: UnknownCommandPolicy,
}

impl CommandRouter {
    /// Create an empty router that rejects unknown commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty router with the given unknown-command policy.
    pub fn with_policy(unknown_commands: UnknownCommandPolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            open: None,
            unknown_commands,
        }
    }

    /// The unknown-command policy in effect.
    pub fn policy(&self) -> UnknownCommandPolicy {
        self.unknown_commands
    }

    /// Register a closure for `command`, replacing any existing handler.
    ///
    /// The command is not validated. A command containing `": "` can never be
    /// reached by [`dispatch`](Self::dispatch).
    pub fn register<F>(&mut self, command: impl Into<String>, handler: F)
    where
        F: Fn(&str) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(command, handler);
    }

    /// Register a closure whose reply is sent back to the sender, replacing
    /// any existing handler.
    pub fn register_responder<F>(&mut self, command: impl Into<String>, handler: F)
    where
        F: Fn(&str) -> ReplyResult + Send + Sync + 'static,
    {
        self.register_handler(command, Responder(handler));
    }

    /// Register any [`Handler`] for `command`, replacing any existing handler.
    pub fn register_handler<H>(&mut self, command: impl Into<String>, handler: H)
    where
        H: Handler + 'static,
    {
        let command = command.into();
        if self.handlers.insert(command.clone(), Arc::new(handler)).is_some() {
            debug!(command = %command, "Replaced handler");
        } else {
            debug!(command = %command, "Registered handler");
        }
    }

    /// Register a closure for `command`, refusing anything [`register`](Self::register)
    /// would silently accept.
    ///
    /// Fails if the command is empty, longer than 255 characters, contains a
    /// colon, is the reserved control command, or already has a handler.
    pub fn try_register<F>(&mut self, command: impl Into<String>, handler: F) -> Result<(), WireError>
    where
        F: Fn(&str) -> HandlerResult + Send + Sync + 'static,
    {
        let command = command.into();
        validate_command(&command)?;

        if command == CONTROL_COMMAND {
            return Err(WireError::InvalidCommand {
                kind: CommandErrorKind::Reserved { command },
            });
        }

        if self.handlers.contains_key(&command) {
            return Err(WireError::DuplicateCommand { name: command });
        }

        self.register_handler(command, handler);
        Ok(())
    }

    /// Set the hook run once when a session starts.
    ///
    /// The hook receives the session id; its reply, if any, is the first
    /// message the session sends.
    pub fn on_open<F>(&mut self, hook: F)
    where
        F: Fn(&str) -> ReplyResult + Send + Sync + 'static,
    {
        self.open = Some(Arc::new(Responder(hook)));
    }

    /// Run the open hook for a new session.
    ///
    /// Returns `Ok(None)` when no hook is set. A hook error is returned as
    /// the source of `WireError::Handler` for the command `open`.
    pub fn open(&self, session_id: &str) -> Result<Option<Reply>, WireError> {
        let Some(hook) = &self.open else {
            return Ok(None);
        };

        hook.respond(session_id).map_err(|source| WireError::Handler {
            command: "open".to_string(),
            source,
        })
    }

    /// Get the handler for a command.
    pub fn get(&self, command: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(command).cloned()
    }

    /// Whether a handler is registered for `command`.
    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// List all registered command names.
    pub fn commands(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Parse `message` and run the matching handler.
    ///
    /// Malformed messages are dropped with `Ok(Outcome::Malformed)`. A
    /// well-formed message for an unregistered command is handled according
    /// to the router's [`UnknownCommandPolicy`]. A handler error is returned
    /// as the source of `WireError::Handler` without modification. A handler
    /// reply comes back as `Outcome::Replied`.
    pub fn dispatch(&self, message: &str) -> Result<Outcome, WireError> {
        let Some(msg) = Message::parse(message) else {
            trace!("Dropping malformed message");
            return Ok(Outcome::Malformed);
        };

        let Some(handler) = self.handlers.get(msg.command) else {
            return match self.unknown_commands {
                UnknownCommandPolicy::Reject => Err(WireError::UnknownCommand {
                    name: msg.command.to_string(),
                }),
                UnknownCommandPolicy::Ignore => {
                    debug!(command = %msg.command, "Ignoring unknown command");
                    Ok(Outcome::Unrouted)
                }
            };
        };

        trace!(command = %msg.command, payload_len = msg.payload.len(), "Dispatching");
        let reply = handler
            .respond(msg.payload)
            .map_err(|source| WireError::Handler {
                command: msg.command.to_string(),
                source,
            })?;

        Ok(match reply {
            Some(reply) => Outcome::Replied(reply),
            None => Outcome::Handled,
        })
    }
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRouter")
            .field("commands", &self.commands())
            .field("has_open_hook", &self.open.is_some())
            .field("unknown_commands", &self.unknown_commands)
            .finish()
    }
}
