//! Types shared by the router and its callers.

use serde::Deserialize;

use crate::error::{ProtocolErrorKind, WireError};
use crate::protocol::Message;

/// What a successful dispatch did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A handler ran and returned `Ok` with nothing to send back.
    Handled,
    /// A handler ran and produced a reply for the sender.
    Replied(Reply),
    /// The message was not `"<command>: <payload>"`; nothing ran.
    Malformed,
    /// No handler for the command, and the router ignores unknown commands.
    Unrouted,
}

/// A message a handler wants sent back on its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub command: String,
    pub payload: String,
}

impl Reply {
    pub fn new(command: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: payload.into(),
        }
    }

    /// Render as a single `"<command>: <payload>"` line.
    ///
    /// Fails if the command is invalid or the payload contains a line break.
    pub fn encode(&self) -> Result<String, WireError> {
        if self.payload.contains('\n') {
            return Err(WireError::Protocol {
                kind: ProtocolErrorKind::InvalidMessageFormat {
                    message: "reply may not contain a line break".to_string(),
                },
            });
        }

        Ok(Message::new(&self.command, &self.payload)?.encode())
    }
}

/// How the router treats a well-formed message for an unregistered command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCommandPolicy {
    /// Return `WireError::UnknownCommand`.
    #[default]
    Reject,
    /// Return `Outcome::Unrouted` and do nothing.
    Ignore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_encode() {
        assert_eq!(Reply::new("pong", "a: b").encode().unwrap(), "pong: a: b");
        assert_eq!(Reply::new("pong", "").encode().unwrap(), "pong: ");
    }

    #[test]
    fn test_reply_encode_rejects_bad_replies() {
        assert!(matches!(
            Reply::new("", "x").encode(),
            Err(WireError::InvalidCommand { .. })
        ));
        assert!(matches!(
            Reply::new("a:b", "x").encode(),
            Err(WireError::InvalidCommand { .. })
        ));
        assert!(matches!(
            Reply::new("pong", "two\nlines").encode(),
            Err(WireError::Protocol {
                kind: ProtocolErrorKind::InvalidMessageFormat { .. }
            })
        ));
    }
}
