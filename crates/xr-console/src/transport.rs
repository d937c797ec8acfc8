//! Transport establishment.
//!
//! The automaton treats the transport as an external collaborator: a
//! byte stream it can read with a timeout, write to, and close. This
//! module provides the one concrete transport the crate ships, a raw
//! TCP connection to a reverse-telnet console server, plus the telnet
//! control bytes used for liveness probing. Everything else in the
//! crate is generic over `AsyncRead + AsyncWrite`.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{ConsoleError, Result};

/// Telnet Interpret-As-Command byte.
pub const IAC: u8 = 255;

/// Telnet No-Operation byte. `IAC NOP` is a harmless probe the far end
/// must swallow; a failed write means the connection is gone.
pub const NOP: u8 = 241;

/// Number of `IAC NOP` probes a liveness check sends.
pub const NOP_PROBES: usize = 3;

/// Open a TCP connection to a reverse-telnet console, bounded by
/// `timeout`.
///
/// # Errors
///
/// Returns [`ConsoleError::Connect`] when the connection is refused and
/// [`ConsoleError::ConnectTimeout`] when it does not complete in time.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    debug!(host, port, ?timeout, "connecting to console");
    let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| ConsoleError::connect_timeout(host, port, timeout))?
        .map_err(|e| ConsoleError::connect(host, port, e))?;
    // Console dialogues are short interactive lines; coalescing hurts.
    stream
        .set_nodelay(true)
        .map_err(|e| ConsoleError::transport("configuring socket", e))?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_refused_surfaces_connect_error() {
        // Port 1 on localhost is almost certainly closed.
        let result = connect("127.0.0.1", 1, Duration::from_secs(2)).await;
        match result {
            Err(ConsoleError::Connect { host, port, .. }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 1);
            }
            Err(ConsoleError::ConnectTimeout { .. }) => {
                // Some environments drop rather than reject; also fine.
            }
            other => panic!("expected a connect error, got {other:?}"),
        }
    }

    #[test]
    fn telnet_probe_bytes() {
        assert_eq!(IAC, 0xFF);
        assert_eq!(NOP, 0xF1);
    }
}
