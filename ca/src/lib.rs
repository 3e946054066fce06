#![forbid(unsafe_code)]
//! Host-side client for the signer trusted application.
//!
//! [`Client`] owns the TEE context and the single session opened against the
//! signer's fixed UUID, and forwards command invocations through a backend.
//! When the secure-world service dies mid-command (the platform reports
//! [`TeeStatus::TARGET_DEAD`](signer_proto::TeeStatus::TARGET_DEAD)), the
//! client tears down and rebuilds the context/session pair in place, so
//! callers keep a continuously usable handle across TA panics.

pub mod error;
#[cfg(feature = "backend-in-memory")]
pub mod in_memory;
#[cfg(feature = "backend-optee")]
pub mod optee;

use signer_proto::CommandId;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, InvokeFailure, Result};

/// Platform capability for contexts and sessions.
///
/// [`Client`] drives every context and session transition through this trait,
/// which is what lets the recovery sequence run unmodified against the
/// in-memory backend in tests.
pub trait BackendT {
    type Context;
    type Session: SessionT;

    /// Connects to the TEE runtime with platform-default configuration.
    fn initialize_context(&mut self) -> Result<Self::Context>;

    /// Opens a session against `identity` using public login.
    fn open_session(
        &mut self,
        ctx: &mut Self::Context,
        identity: &Uuid,
    ) -> Result<Self::Session>;
}

/// An established channel to one secure-world service instance.
///
/// Dropping a session closes it. A session must always be dropped before the
/// context it was opened within.
pub trait SessionT {
    /// Issues one command invocation and returns the number of response bytes
    /// written into `response_buf`.
    fn invoke(
        &mut self,
        command: CommandId,
        request: &[u8],
        response_buf: &mut [u8],
    ) -> std::result::Result<usize, InvokeFailure>;
}

/// Lifecycle state of a [`Client`], driven by the recovery coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// The held session is presumed valid; dispatch proceeds normally.
    Active,
    /// A service panic was detected and the context/session pair is being
    /// rebuilt. Only observable from inside the rebuild.
    Recovering,
    /// A recovery step failed. Terminal; no further dispatch succeeds.
    Failed,
}

/// Handle to the signer service.
///
/// Owns the context, the single session, and the recovery state machine.
/// `&mut self` throughout: there is no concurrent mutator by construction.
pub struct Client<B: BackendT> {
    backend: B,
    identity: Uuid,
    state: ClientState,
    // Declared before `ctx` so a plain drop closes the session first.
    session: Option<B::Session>,
    ctx: Option<B::Context>,
    span: tracing::Span,
}

impl<B: BackendT> Client<B> {
    /// Initializes a context and opens the session against the signer's
    /// fixed identity. Either failure is fatal to the caller.
    pub fn connect(mut backend: B) -> Result<Self> {
        let identity =
            Uuid::parse_str(signer_proto::TA_UUID).expect("uuid.txt holds a valid uuid");
        let span = tracing::info_span!("signer-client", %identity);
        let span_guard = span.enter();

        let mut ctx = backend.initialize_context()?;
        let session = backend.open_session(&mut ctx, &identity)?;
        debug!("context initialized and session opened");
        drop(span_guard);

        Ok(Self {
            backend,
            identity,
            state: ClientState::Active,
            session: Some(session),
            ctx: Some(ctx),
            span,
        })
    }

    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Issues `command` through the current session.
    ///
    /// Fails fast with [`Error::NoActiveSession`] when no live session is
    /// held; no platform call is made in that case. A
    /// [`TeeStatus::TARGET_DEAD`](signer_proto::TeeStatus::TARGET_DEAD)
    /// status triggers the recovery sequence and surfaces as
    /// [`Error::ServicePanic`]; any other failure status is returned
    /// verbatim as [`Error::Command`].
    pub fn invoke(
        &mut self,
        command: CommandId,
        request: &[u8],
        response_buf: &mut [u8],
    ) -> Result<usize> {
        if self.state == ClientState::Failed {
            return Err(Error::NoActiveSession);
        }
        let Some(session) = self.session.as_mut() else {
            return Err(Error::NoActiveSession);
        };

        let span_guard = self.span.enter();
        let outcome = session.invoke(command, request, response_buf);
        drop(span_guard);

        match outcome {
            Ok(nbytes) => Ok(nbytes),
            Err(failure) if failure.status.is_target_dead() => {
                self.recover(command)?;
                Err(Error::ServicePanic)
            }
            Err(InvokeFailure { status, origin }) => Err(Error::Command { status, origin }),
        }
    }

    /// Invokes `command`, retrying once if the service panicked and the
    /// session was re-established underneath the call.
    pub fn invoke_with_retry(
        &mut self,
        command: CommandId,
        request: &[u8],
        response_buf: &mut [u8],
    ) -> Result<usize> {
        match self.invoke(command, request, response_buf) {
            Err(Error::ServicePanic) => self.invoke(command, request, response_buf),
            outcome => outcome,
        }
    }

    /// Closes the session and finalizes the context, session first. After
    /// this every [`invoke`](Self::invoke) returns
    /// [`Error::NoActiveSession`].
    pub fn close(&mut self) {
        let _span_guard = self.span.enter();
        drop(self.session.take());
        drop(self.ctx.take());
        debug!("session closed and context finalized");
    }

    /// Tears down and rebuilds the context/session pair after a detected
    /// service panic, in strict order: close session, finalize context,
    /// initialize a fresh context, re-open the session.
    ///
    /// Runs at most once per detected panic. Any step failure is terminal:
    /// the client transitions to [`ClientState::Failed`] and the step's
    /// error propagates to the caller.
    fn recover(&mut self, command: CommandId) -> Result<()> {
        let _span_guard = self.span.enter();
        warn!(?command, "service terminated mid-command, rebuilding context and session");
        self.state = ClientState::Recovering;

        drop(self.session.take());
        drop(self.ctx.take());

        let mut ctx = match self.backend.initialize_context() {
            Ok(ctx) => ctx,
            Err(err) => {
                self.state = ClientState::Failed;
                return Err(err);
            }
        };
        let session = match self.backend.open_session(&mut ctx, &self.identity) {
            Ok(session) => session,
            Err(err) => {
                self.state = ClientState::Failed;
                return Err(err);
            }
        };

        self.session = Some(session);
        self.ctx = Some(ctx);
        self.state = ClientState::Active;
        debug!("fresh context and session installed");

        Ok(())
    }
}
