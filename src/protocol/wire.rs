//! Wire format for message framing.
//!
//! One message per line: `[UTF-8 text]\n`. A trailing `\r` is also stripped.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{ProtocolErrorKind, WireError};

/// Maximum line length in bytes, excluding the terminator.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 65_536;

/// Read one line-framed message from the reader.
///
/// A final line without a terminator is still returned. Returns
/// `ConnectionClosed` once the reader is exhausted.
pub async fn read_message<R>(reader: &mut R, max_size: usize) -> Result<String, WireError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    // Room for a full-length line plus "\r\n".
    let limit = max_size as u64 + 2;
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if read == 0 {
        return Err(WireError::Protocol {
            kind: ProtocolErrorKind::ConnectionClosed,
        });
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    if buf.len() > max_size {
        return Err(WireError::Protocol {
            kind: ProtocolErrorKind::MessageTooLarge { max: max_size },
        });
    }

    String::from_utf8(buf).map_err(|e| WireError::Protocol {
        kind: ProtocolErrorKind::InvalidMessageFormat {
            message: format!("Invalid UTF-8: {}", e),
        },
    })
}

/// Write a line-framed message to the writer.
pub async fn write_message<W>(writer: &mut W, message: &str) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    if message.contains('\n') {
        return Err(WireError::Protocol {
            kind: ProtocolErrorKind::InvalidMessageFormat {
                message: "message may not contain a line break".to_string(),
            },
        });
    }

    writer.write_all(message.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Read a line-framed message with a timeout.
///
/// Returns a ConnectionTimeout error if the read takes longer than the specified duration.
pub async fn read_message_with_timeout<R>(
    reader: &mut R,
    max_size: usize,
    timeout_duration: Duration,
) -> Result<String, WireError>
where
    R: AsyncBufRead + Unpin,
{
    timeout(timeout_duration, read_message(reader, max_size))
        .await
        .map_err(|_| WireError::Protocol {
            kind: ProtocolErrorKind::ConnectionTimeout,
        })?
}

/// Write a line-framed message with a timeout.
pub async fn write_message_with_timeout<W>(
    writer: &mut W,
    message: &str,
    timeout_duration: Duration,
) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    timeout(timeout_duration, write_message(writer, message))
        .await
        .map_err(|_| WireError::Protocol {
            kind: ProtocolErrorKind::ConnectionTimeout,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_write_and_read_message() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, "chat: hello world").await.unwrap();
        assert_eq!(buffer, b"chat: hello world\n");

        let mut cursor = Cursor::new(buffer);
        let result = read_message(&mut cursor, DEFAULT_MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        assert_eq!(result, "chat: hello world");
    }

    #[tokio::test]
    async fn test_read_strips_crlf_and_keeps_order() {
        let mut cursor = Cursor::new(b"a: 1\r\nb: 2\nc: 3".to_vec());
        assert_eq!(read_message(&mut cursor, 64).await.unwrap(), "a: 1");
        assert_eq!(read_message(&mut cursor, 64).await.unwrap(), "b: 2");
        assert_eq!(read_message(&mut cursor, 64).await.unwrap(), "c: 3");
        assert!(matches!(
            read_message(&mut cursor, 64).await,
            Err(WireError::Protocol {
                kind: ProtocolErrorKind::ConnectionClosed
            })
        ));
    }

    #[tokio::test]
    async fn test_message_at_limit_is_accepted() {
        let mut data = vec![b'x'; 8];
        data.push(b'\n');
        let mut cursor = Cursor::new(data);
        assert_eq!(read_message(&mut cursor, 8).await.unwrap(), "xxxxxxxx");
    }

    #[tokio::test]
    async fn test_crlf_line_at_limit_is_accepted() {
        let mut cursor = Cursor::new(b"xxxxxxxx\r\nyyyyyyyyy\r\n".to_vec());
        assert_eq!(read_message(&mut cursor, 8).await.unwrap(), "xxxxxxxx");
        assert!(matches!(
            read_message(&mut cursor, 8).await,
            Err(WireError::Protocol {
                kind: ProtocolErrorKind::MessageTooLarge { max: 8 }
            })
        ));
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let mut data = vec![b'x'; 100];
        data.push(b'\n');
        let mut cursor = Cursor::new(data);

        let result = read_message(&mut cursor, 16).await;
        assert!(matches!(
            result,
            Err(WireError::Protocol {
                kind: ProtocolErrorKind::MessageTooLarge { max: 16 }
            })
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let mut cursor = Cursor::new(vec![0xff, 0xfe, b'\n']);
        assert!(matches!(
            read_message(&mut cursor, 64).await,
            Err(WireError::Protocol {
                kind: ProtocolErrorKind::InvalidMessageFormat { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_write_rejects_line_break() {
        let mut buffer = Vec::new();
        let result = write_message(&mut buffer, "chat: two\nlines").await;
        assert!(result.is_err());
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (_client, server) = tokio::io::duplex(64);
        let mut reader = tokio::io::BufReader::new(server);
        let result =
            read_message_with_timeout(&mut reader, 64, Duration::from_millis(20)).await;
        assert!(matches!(
            result,
            Err(WireError::Protocol {
                kind: ProtocolErrorKind::ConnectionTimeout
            })
        ));
    }
}
