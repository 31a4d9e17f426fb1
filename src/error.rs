//! Error types for sessions and script runs.
//!
//! [`SessionError`] is what the protocol layer reports. [`RunError`] is the
//! runner-level view of the same failures plus the initialization problems,
//! each with its own process exit code.

use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by a console session.
///
/// `partial` fields hold whatever the peer sent during the failed exchange,
/// decoded lossily and trimmed of surrounding whitespace.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not connect to {address}: {message}")]
    Connect { address: String, message: String },

    #[error("read failed: {message}")]
    Read { message: String, partial: String },

    #[error("timeout occurred after {}ms waiting for {delimiter:?}", .elapsed.as_millis())]
    Timeout {
        elapsed: Duration,
        delimiter: String,
        partial: String,
    },

    /// The credential exchange did not reach the command prompt. Never
    /// carries the credentials themselves.
    #[error("login was not accepted: {partial}")]
    InvalidLogin { partial: String },

    #[error("failed to send line: {0}")]
    Write(#[source] std::io::Error),

    #[error("session is closed")]
    Closed,
}

impl SessionError {
    /// Output received before the failure, if the error carries any.
    pub fn partial(&self) -> Option<&str> {
        match self {
            SessionError::Read { partial, .. }
            | SessionError::Timeout { partial, .. }
            | SessionError::InvalidLogin { partial } => Some(partial),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

/// Failures of a whole script run, as reported by [`crate::ScriptRunner`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("initialization failed: {0:#}")]
    InitFailed(anyhow::Error),

    #[error("cannot run the script before it has been initialized")]
    NotInitialized,

    #[error("invalid login: {partial}")]
    InvalidLogin { partial: String },

    #[error(
        "could not connect to {address}. Either the server and port settings are wrong, \
         the server is down or a firewall is blocking the connection ({message})"
    )]
    Connect { address: String, message: String },

    #[error("a timeout occurred while running the script: {0}")]
    Timeout(SessionError),

    #[error("general I/O failure: {0}")]
    Io(SessionError),
}

impl RunError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::InitFailed(_) => -1,
            RunError::NotInitialized => -2,
            RunError::InvalidLogin { .. } => -3,
            RunError::Connect { .. } => -4,
            RunError::Timeout(_) => -5,
            RunError::Io(_) => -9,
        }
    }
}

impl From<SessionError> for RunError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Connect { address, message } => RunError::Connect { address, message },
            SessionError::InvalidLogin { partial } => RunError::InvalidLogin { partial },
            err @ SessionError::Timeout { .. } => RunError::Timeout(err),
            err => RunError::Io(err),
        }
    }
}
