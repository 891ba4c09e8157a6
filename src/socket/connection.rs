//! Per-connection handler.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::net::UnixStream;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::error::{ProtocolErrorKind, WireError};
use crate::protocol::{read_message_with_timeout, write_message_with_timeout, Message, CONTROL_COMMAND};
use crate::router::{CommandRouter, Outcome};

/// Reply sent when the router rejects an unknown command.
pub const REPLY_UNSUPPORTED: &str = "command not supported by server";

/// Reply sent when a handler returns an error.
pub const REPLY_FAILED: &str = "command failed";

/// Handle a single client connection with its own router.
pub async fn handle_connection(
    stream: UnixStream,
    router: CommandRouter,
    limits: &LimitsConfig,
) -> Result<(), WireError> {
    let session_id = Uuid::new_v4();
    debug!(session_id = %session_id, commands = router.len(), "Session started");

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    serve_session(&mut reader, &mut writer, &router, limits, session_id).await
}

/// Read and dispatch messages until the peer disconnects or goes idle.
///
/// The router's open hook runs first; an error from it ends the session.
/// Messages are dispatched one at a time, in arrival order, and handler
/// replies are written back on the same connection.
pub async fn serve_session<R, W>(
    reader: &mut R,
    writer: &mut W,
    router: &CommandRouter,
    limits: &LimitsConfig,
    session_id: Uuid,
) -> Result<(), WireError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let socket_timeout = Duration::from_secs(limits.socket_timeout_seconds);

    match router.open(&session_id.to_string()) {
        Ok(Some(reply)) => {
            let line = reply.encode()?;
            write_message_with_timeout(writer, &line, socket_timeout).await?;
        }
        Ok(None) => {}
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Open hook refused session");
            return Err(e);
        }
    }

    loop {
        let result = process_message(
            reader,
            writer,
            router,
            limits.max_message_size,
            socket_timeout,
            session_id,
        )
        .await;

        match result {
            Ok(()) => continue,
            Err(WireError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed,
            }) => {
                debug!(session_id = %session_id, "Client disconnected");
                return Ok(());
            }
            Err(WireError::Protocol {
                kind: ProtocolErrorKind::ConnectionTimeout,
            }) => {
                warn!(session_id = %session_id, "Connection timed out");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}

/// Process a single message from the client.
async fn process_message<R, W>(
    reader: &mut R,
    writer: &mut W,
    router: &CommandRouter,
    max_message_size: usize,
    socket_timeout: Duration,
    session_id: Uuid,
) -> Result<(), WireError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // The whole line was consumed, so an undecodable one is dropped like
    // any other malformed message.
    let raw = match read_message_with_timeout(reader, max_message_size, socket_timeout).await {
        Ok(raw) => raw,
        Err(WireError::Protocol {
            kind: ProtocolErrorKind::InvalidMessageFormat { message },
        }) => {
            debug!(session_id = %session_id, reason = %message, "Dropped undecodable message");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let line = match router.dispatch(&raw) {
        Ok(Outcome::Handled) | Ok(Outcome::Unrouted) => None,
        Ok(Outcome::Replied(reply)) => match reply.encode() {
            Ok(line) => Some(line),
            Err(e) => {
                error!(
                    session_id = %session_id,
                    command = %reply.command,
                    error = %e,
                    "Handler produced an invalid reply"
                );
                Some(control_line(REPLY_FAILED)?)
            }
        },
        Ok(Outcome::Malformed) => {
            debug!(session_id = %session_id, len = raw.len(), "Dropped malformed message");
            None
        }
        Err(WireError::UnknownCommand { name }) => {
            warn!(session_id = %session_id, command = %name, "Unknown command");
            Some(control_line(REPLY_UNSUPPORTED)?)
        }
        Err(WireError::Handler { command, source }) => {
            error!(
                session_id = %session_id,
                command = %command,
                error = %source,
                "Handler failed"
            );
            Some(control_line(REPLY_FAILED)?)
        }
        Err(e) => return Err(e),
    };

    if let Some(line) = line {
        write_message_with_timeout(writer, &line, socket_timeout).await?;
    }

    Ok(())
}

fn control_line(text: &str) -> Result<String, WireError> {
    Ok(Message::new(CONTROL_COMMAND, text)?.encode())
}
