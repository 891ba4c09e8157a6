//! Error types for cmdwire.

use thiserror::Error;

/// Error returned by a handler. Passed through the router untouched.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum WireError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Socket-related errors.
    #[error("Socket error: {message}")]
    Socket { message: String },

    /// A command name failed validation.
    #[error("Invalid command: {kind}")]
    InvalidCommand { kind: CommandErrorKind },

    /// Strict registration found an existing handler.
    #[error("Command already registered: {name}")]
    DuplicateCommand { name: String },

    /// A well-formed message named a command with no handler.
    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    /// The handler itself failed.
    #[error("Handler for '{command}' failed: {source}")]
    Handler {
        command: String,
        #[source]
        source: HandlerError,
    },

    /// Protocol errors.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Command name validation failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandErrorKind {
    #[error("command may not be empty")]
    Empty,

    #[error("command is {len} characters, maximum is {max}")]
    TooLong { len: usize, max: usize },

    #[error("command may not contain a colon: {command}")]
    ContainsColon { command: String },

    #[error("command {command} is reserved")]
    Reserved { command: String },
}

/// Protocol error kinds.
#[derive(Error, Debug)]
pub enum ProtocolErrorKind {
    #[error("Message too large: exceeds maximum of {max} bytes")]
    MessageTooLarge { max: usize },

    #[error("Invalid message format: {message}")]
    InvalidMessageFormat { message: String },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timed out")]
    ConnectionTimeout,
}

/// Result type alias for cmdwire operations.
pub type WireResult<T> = Result<T, WireError>;
