//! The `"<command>: <payload>"` message format.

use std::fmt;

use crate::error::{CommandErrorKind, WireError};

/// Separator between command and payload.
pub const DELIMITER: &str = ": ";

/// Maximum command length, in characters.
pub const MAX_COMMAND_LEN: usize = 255;

/// Command used for replies the session writes on its own behalf.
pub const CONTROL_COMMAND: &str = "router";

/// A message split into its command and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    /// Text before the first delimiter.
    pub command: &'a str,

    /// Everything after the first delimiter, verbatim.
    pub payload: &'a str,
}

impl<'a> Message<'a> {
    /// Split a raw message at the first `": "`.
    ///
    /// Returns `None` when there is no delimiter, the command is empty, or the
    /// command is longer than [`MAX_COMMAND_LEN`] characters. Later delimiters
    /// stay in the payload.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let end = raw.find(DELIMITER)?;
        if end == 0 {
            return None;
        }

        let command = &raw[..end];
        if command.chars().count() > MAX_COMMAND_LEN {
            return None;
        }

        Some(Self {
            command,
            payload: &raw[end + DELIMITER.len()..],
        })
    }

    /// Build an outbound message, validating the command.
    pub fn new(command: &'a str, payload: &'a str) -> Result<Self, WireError> {
        validate_command(command)?;
        Ok(Self { command, payload })
    }

    /// Render as `"<command>: <payload>"`.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.command, DELIMITER, self.payload)
    }
}

/// Check that a command name can round-trip through [`Message::parse`].
///
/// Commands must be 1 to 255 characters and may not contain a colon.
pub fn validate_command(command: &str) -> Result<(), WireError> {
    if command.is_empty() {
        return Err(WireError::InvalidCommand {
            kind: CommandErrorKind::Empty,
        });
    }

    let len = command.chars().count();
    if len > MAX_COMMAND_LEN {
        return Err(WireError::InvalidCommand {
            kind: CommandErrorKind::TooLong {
                len,
                max: MAX_COMMAND_LEN,
            },
        });
    }

    if command.contains(':') {
        return Err(WireError::InvalidCommand {
            kind: CommandErrorKind::ContainsColon {
                command: command.to_string(),
            },
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normal() {
        let msg = Message::parse("command: message").unwrap();
        assert_eq!(msg.command, "command");
        assert_eq!(msg.payload, "message");
    }

    #[test]
    fn test_parse_without_delimiter() {
        assert!(Message::parse("hello world").is_none());
        assert!(Message::parse("command:message").is_none());
    }

    #[test]
    fn test_parse_empty_command() {
        assert!(Message::parse(": payload").is_none());
    }

    #[test]
    fn test_parse_command_length_bound() {
        let at_limit = format!("{}: x", "a".repeat(MAX_COMMAND_LEN));
        let msg = Message::parse(&at_limit).unwrap();
        assert_eq!(msg.command.len(), MAX_COMMAND_LEN);

        let over_limit = format!("{}: x", "a".repeat(MAX_COMMAND_LEN + 1));
        assert!(Message::parse(&over_limit).is_none());
    }

    #[test]
    fn test_parse_counts_characters_not_bytes() {
        // 255 two-byte characters
        let raw = format!("{}: x", "é".repeat(MAX_COMMAND_LEN));
        let msg = Message::parse(&raw).unwrap();
        assert_eq!(msg.command.chars().count(), MAX_COMMAND_LEN);
    }

    #[test]
    fn test_parse_empty_payload() {
        let msg = Message::parse("PING: ").unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.payload, "");
    }

    #[test]
    fn test_parse_splits_on_first_delimiter_only() {
        let msg = Message::parse("MOVE: 10: 20").unwrap();
        assert_eq!(msg.command, "MOVE");
        assert_eq!(msg.payload, "10: 20");
    }

    #[test]
    fn test_encode() {
        let msg = Message::new("chat", "hi: there").unwrap();
        assert_eq!(msg.encode(), "chat: hi: there");
    }

    #[test]
    fn test_validate_command() {
        assert!(validate_command("test").is_ok());
        assert!(matches!(
            validate_command(""),
            Err(WireError::InvalidCommand {
                kind: CommandErrorKind::Empty
            })
        ));
        assert!(matches!(
            validate_command(&"x".repeat(256)),
            Err(WireError::InvalidCommand {
                kind: CommandErrorKind::TooLong { len: 256, .. }
            })
        ));
        assert!(matches!(
            validate_command("test: with colon"),
            Err(WireError::InvalidCommand {
                kind: CommandErrorKind::ContainsColon { .. }
            })
        ));
    }
}
