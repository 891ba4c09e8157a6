//! Wire protocol module.
//!
//! Defines the message format and line framing for socket communication.
//!
//! ## Wire Format
//!
//! Each message is a single line:
//! ```text
//! <command>: <payload>\n
//! ```

mod message;
mod wire;

pub use message::{validate_command, Message, CONTROL_COMMAND, DELIMITER, MAX_COMMAND_LEN};
pub use wire::{
    read_message, read_message_with_timeout, write_message, write_message_with_timeout,
    DEFAULT_MAX_MESSAGE_SIZE,
};
