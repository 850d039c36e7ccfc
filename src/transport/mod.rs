//! Transport layer: one HTTP exchange per command.

pub mod http;

pub use http::SynchronousTransport;

use std::error::Error as StdError;
use url::Url;

/// Non-result HTTP response: `"<code> <reason>: <body>"`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status} {reason}: {body}")]
pub struct ProtocolError {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl ProtocolError {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }
}

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure below the protocol: the exchange itself did not complete.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A single read waited longer than the read timeout.
    #[error("read timed out: {source}")]
    Timeout {
        #[source]
        source: BoxError,
    },

    #[error("connection failed: {source}")]
    Connection {
        #[source]
        source: BoxError,
    },

    #[error("HTTP error: {0}")]
    Http(#[source] BoxError),
}

impl TransportError {
    /// Timeouts are told apart from other socket failures here, at the boundary.
    pub(crate) fn from_ureq(error: ureq::Transport) -> Self {
        match error.kind() {
            ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
                TransportError::Connection {
                    source: Box::new(error),
                }
            }
            _ if has_timeout(&error) => TransportError::Timeout {
                source: Box::new(error),
            },
            ureq::ErrorKind::Io => TransportError::Connection {
                source: Box::new(error),
            },
            _ => TransportError::Http(Box::new(error)),
        }
    }

    /// Failure while reading the response body.
    pub(crate) fn from_io(error: std::io::Error) -> Self {
        if has_timeout(&error) {
            TransportError::Timeout {
                source: Box::new(error),
            }
        } else if error.kind() == std::io::ErrorKind::InvalidData {
            TransportError::Http(Box::new(error))
        } else {
            TransportError::Connection {
                source: Box::new(error),
            }
        }
    }
}

fn io_errors<'a>(error: &'a (dyn StdError + 'static)) -> impl Iterator<Item = &'a std::io::Error> {
    std::iter::successors(Some(error), |&e| e.source())
        .filter_map(|e| e.downcast_ref::<std::io::Error>())
}

/// Socket read deadlines surface as `WouldBlock` on Unix and `TimedOut` elsewhere.
fn has_timeout(error: &(dyn StdError + 'static)) -> bool {
    io_errors(error).any(|e| {
        matches!(
            e.kind(),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
        )
    })
}

/// Placeholder for work that already completed synchronously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyRequest;

impl EmptyRequest {
    pub fn new() -> Self {
        EmptyRequest
    }

    /// Returns immediately; there is nothing to wait for.
    pub fn wait(&self) -> bool {
        true
    }
}

/// Join the endpoint's base path with a command's relative path.
///
/// `/api/` + `/d/status` -> `/api/d/status`
pub fn resolve_path(url: &Url, relative: &str) -> String {
    let base = url.path();
    let separator = if base.ends_with('/') { "" } else { "/" };
    format!("{}{}{}", base, separator, relative.trim_start_matches('/'))
}

/// Decide whether a response body is a result for the caller.
///
/// 2xx and 400 bodies are results; 400 carries structured command errors.
/// Any other status whose body starts with `[[` is also taken as a result
/// envelope. That last rule can accept an error page that happens to start
/// with `[[`.
pub fn classify_response(
    status: u16,
    reason: &str,
    body: String,
) -> Result<String, ProtocolError> {
    if (200..300).contains(&status) || status == 400 || body.starts_with("[[") {
        Ok(body)
    } else {
        Err(ProtocolError::new(status, reason, body))
    }
}
