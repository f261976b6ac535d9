//! User-facing error taxonomy and process exit-code mapping.
//!
//! Most of the crate propagates `anyhow::Error` with context. The two
//! failure classes a user can act on, bad configuration and a misbehaving
//! upstream API, are carried as [`ExtractError`] so the binary can exit
//! with a distinct code.

use thiserror::Error;

/// Exit code for errors the user can correct (configuration, upstream).
pub const EXIT_USER_ERROR: i32 = 1;
/// Exit code for internal failures and collaborator contract violations.
pub const EXIT_INTERNAL_ERROR: i32 = 2;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Missing, malformed, or inconsistent configuration input.
    #[error("{0}")]
    Config(String),
    /// The API collaborator returned something other than the expected
    /// record sequence.
    #[error("{0}")]
    Upstream(String),
}

impl ExtractError {
    pub fn config(message: impl Into<String>) -> Self {
        ExtractError::Config(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ExtractError::Upstream(message.into())
    }
}

/// Resolve the process exit code for a failed run.
///
/// Walks the whole error chain so that contexts layered on top of an
/// [`ExtractError`] do not hide the user-facing classification.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err
        .chain()
        .any(|cause| cause.downcast_ref::<ExtractError>().is_some())
    {
        EXIT_USER_ERROR
    } else {
        EXIT_INTERNAL_ERROR
    }
}
