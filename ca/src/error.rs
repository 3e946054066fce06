//! Error taxonomy for the host-side client.

use signer_proto::{Origin, TeeStatus};

pub type Result<T> = std::result::Result<T, Error>;

/// Raw failure reported by the platform's command-invocation primitive.
///
/// Classifying the status (service panic vs ordinary command failure) is the
/// client's job, not the backend's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeFailure {
    pub status: TeeStatus,
    /// Which protocol layer reported the status, when the platform says.
    pub origin: Option<Origin>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The TEE runtime could not be reached or rejected initialization.
    #[error("failed to initialize TEE context: {status}")]
    ContextInit { status: TeeStatus },

    /// The service identity could not be connected to.
    #[error("failed to open session: {status}{}", fmt_origin(.origin))]
    SessionOpen {
        status: TeeStatus,
        origin: Option<Origin>,
    },

    /// A dispatch was attempted with no valid session. The platform is not
    /// touched; the caller simply gets this failure outcome.
    #[error("no active session")]
    NoActiveSession,

    /// The service terminated unexpectedly mid-command. A fresh context and
    /// session have already been installed; the caller may retry once.
    #[error("service panicked mid-command; session re-established, retry the command")]
    ServicePanic,

    /// Ordinary command-level failure, propagated verbatim. Never triggers
    /// recovery.
    #[error("command failed: {status}{}", fmt_origin(.origin))]
    Command {
        status: TeeStatus,
        origin: Option<Origin>,
    },
}

impl Error {
    /// Startup and recovery failures are unrecoverable without external
    /// intervention; the top-level caller is expected to exit non-zero.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ContextInit { .. } | Error::SessionOpen { .. })
    }
}

fn fmt_origin(origin: &Option<Origin>) -> String {
    origin
        .map(|o| format!(", reported by {o}"))
        .unwrap_or_default()
}
