//! Connection states and session validation.

use std::fmt;
use std::future::Future;

use super::socket::BoxFuture;
use super::Transport;

/// Which part of establishing a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The socket could not be opened, timed out or closed unexpectedly.
    Connection,
    /// Local and remote versions are incompatible.
    Compatibility,
    /// The remote accepted the session but could not start streaming.
    Stream,
}

/// Lifecycle of a connection. Initial state is `Disconnected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Validating,
    Connected,
    Disconnected,
    Error { kind: ErrorKind, detail: String },
}

impl ConnectionState {
    pub(crate) fn error(kind: ErrorKind, detail: impl Into<String>) -> Self {
        ConnectionState::Error {
            kind,
            detail: detail.into(),
        }
    }

    /// Outbound messages are transmitted only in these states.
    #[inline]
    pub fn accepts_sends(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Validating)
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Kind of the error, if this is an error state.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ConnectionState::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Validating => f.write_str("validating"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Error { kind, detail } => write!(f, "{:?} error: {}", kind, detail),
        }
    }
}

/// Why a freshly opened session was refused. Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Compatibility(String),
    Stream(String),
}

/// Decides whether a freshly opened session is usable.
///
/// Runs once per successful socket open, while the connection is
/// `Validating`. Calls made through the given [`Transport`] are transmitted
/// in that state, so the validator can query the remote before the session
/// is announced as `Connected`.
pub trait SessionValidator: Send + Sync + 'static {
    fn validate(&self, transport: Transport) -> BoxFuture<'static, Result<(), Rejection>>;
}

/// Validator that accepts every session.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SessionValidator for AcceptAll {
    fn validate(&self, _transport: Transport) -> BoxFuture<'static, Result<(), Rejection>> {
        Box::pin(async { Ok(()) })
    }
}

/// Adapter turning an async closure into a [`SessionValidator`].
pub struct FnValidator<F>(F);

/// Build a validator from an async closure.
pub fn validator_fn<F, Fut>(f: F) -> FnValidator<F>
where
    F: Fn(Transport) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Rejection>> + Send + 'static,
{
    FnValidator(f)
}

impl<F, Fut> SessionValidator for FnValidator<F>
where
    F: Fn(Transport) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Rejection>> + Send + 'static,
{
    fn validate(&self, transport: Transport) -> BoxFuture<'static, Result<(), Rejection>> {
        Box::pin((self.0)(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sends_accepted_states() {
        assert!(ConnectionState::Connected.accepts_sends());
        assert!(ConnectionState::Validating.accepts_sends());
        assert!(!ConnectionState::Connecting.accepts_sends());
        assert!(!ConnectionState::Disconnected.accepts_sends());
        assert!(!ConnectionState::error(ErrorKind::Connection, "x").accepts_sends());
    }

    #[test]
    fn test_error_kind_and_display() {
        let state = ConnectionState::error(ErrorKind::Compatibility, "remote 3.0, local 2.1");
        assert_eq!(state.error_kind(), Some(ErrorKind::Compatibility));
        assert_eq!(state.to_string(), "Compatibility error: remote 3.0, local 2.1");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Connected.error_kind(), None);
    }
}
