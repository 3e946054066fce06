//! An in-memory stand-in for the TEE, with scriptable failures.
//!
//! The fake service answers the signer command set deterministically, and
//! every context, session, and invocation event lands in a shared ledger so
//! tests can assert on the exact order of the recovery sequence. Failures
//! are injected per primitive: the next `initialize_context`, `open_session`,
//! or invocation can be made to return an arbitrary status.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use signer_proto::{CommandId, Origin, TeeStatus};
use uuid::Uuid;

use crate::error::{Error, InvokeFailure, Result};
use crate::{BackendT, SessionT};

/// One observable action of the fake platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    InitializeContext,
    FinalizeContext,
    OpenSession { session: u32 },
    CloseSession { session: u32 },
    Invoke { session: u32, command: CommandId },
}

#[derive(Default)]
struct ServiceState {
    events: Mutex<Vec<Event>>,
    fail_initialize: Mutex<VecDeque<TeeStatus>>,
    fail_open: Mutex<VecDeque<(TeeStatus, Origin)>>,
    fail_invoke: Mutex<VecDeque<(TeeStatus, Origin)>>,
    next_session: AtomicU32,
}

impl ServiceState {
    fn record(&self, event: Event) {
        self.events.lock().expect("lock poisoned").push(event);
    }
}

/// Scriptable fake of the platform invocation primitive.
///
/// Cloning yields another handle onto the same fake platform, which is how
/// tests keep a view on the ledger while the client owns its own copy.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<ServiceState>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded platform events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.state.events.lock().expect("lock poisoned").clone()
    }

    /// Makes the next `initialize_context` fail with `status`.
    pub fn fail_next_initialize(&self, status: TeeStatus) {
        self.state
            .fail_initialize
            .lock()
            .expect("lock poisoned")
            .push_back(status);
    }

    /// Makes the next `open_session` fail with `status`, reported by `origin`.
    pub fn fail_next_open(&self, status: TeeStatus, origin: Origin) {
        self.state
            .fail_open
            .lock()
            .expect("lock poisoned")
            .push_back((status, origin));
    }

    /// Makes the next invocation fail with `status`, reported by `origin`.
    /// Passing [`TeeStatus::TARGET_DEAD`] simulates a service panic.
    pub fn fail_next_invoke(&self, status: TeeStatus, origin: Origin) {
        self.state
            .fail_invoke
            .lock()
            .expect("lock poisoned")
            .push_back((status, origin));
    }
}

pub struct InMemoryContext {
    state: Arc<ServiceState>,
}

impl Drop for InMemoryContext {
    fn drop(&mut self) {
        self.state.record(Event::FinalizeContext);
    }
}

pub struct InMemorySession {
    state: Arc<ServiceState>,
    id: u32,
}

impl InMemorySession {
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.state.record(Event::CloseSession { session: self.id });
    }
}

impl BackendT for InMemoryBackend {
    type Context = InMemoryContext;
    type Session = InMemorySession;

    fn initialize_context(&mut self) -> Result<InMemoryContext> {
        if let Some(status) = self
            .state
            .fail_initialize
            .lock()
            .expect("lock poisoned")
            .pop_front()
        {
            // The runtime was unreachable: nothing to record, nothing opened.
            return Err(Error::ContextInit { status });
        }
        self.state.record(Event::InitializeContext);

        Ok(InMemoryContext {
            state: Arc::clone(&self.state),
        })
    }

    fn open_session(
        &mut self,
        _ctx: &mut InMemoryContext,
        _identity: &Uuid,
    ) -> Result<InMemorySession> {
        if let Some((status, origin)) = self
            .state
            .fail_open
            .lock()
            .expect("lock poisoned")
            .pop_front()
        {
            return Err(Error::SessionOpen {
                status,
                origin: Some(origin),
            });
        }
        let id = self.state.next_session.fetch_add(1, Ordering::Relaxed);
        self.state.record(Event::OpenSession { session: id });

        Ok(InMemorySession {
            state: Arc::clone(&self.state),
            id,
        })
    }
}

impl SessionT for InMemorySession {
    fn invoke(
        &mut self,
        command: CommandId,
        request: &[u8],
        response_buf: &mut [u8],
    ) -> std::result::Result<usize, InvokeFailure> {
        // The platform call happened either way; record it before failing.
        self.state.record(Event::Invoke {
            session: self.id,
            command,
        });
        if let Some((status, origin)) = self
            .state
            .fail_invoke
            .lock()
            .expect("lock poisoned")
            .pop_front()
        {
            return Err(InvokeFailure {
                status,
                origin: Some(origin),
            });
        }

        let response = service_response(command, request);
        if response.len() > response_buf.len() {
            return Err(InvokeFailure {
                status: TeeStatus::SHORT_BUFFER,
                origin: Some(Origin::TrustedApp),
            });
        }
        response_buf[..response.len()].copy_from_slice(&response);

        Ok(response.len())
    }
}

/// Deterministic stand-in for the signer service handlers.
fn service_response(command: CommandId, request: &[u8]) -> Vec<u8> {
    match command {
        CommandId::GenerateNew => vec![0xA5; 32],
        CommandId::GetKeys => Vec::new(),
        CommandId::SignMessage => fake_signature(request).to_vec(),
    }
}

/// A 64-byte value derived from the request, so tests can check that the
/// service's result reaches the caller unchanged.
fn fake_signature(request: &[u8]) -> [u8; 64] {
    let mut sig = [0u8; 64];
    for (i, byte) in request.iter().enumerate() {
        sig[i % 64] ^= byte.rotate_left((i % 8) as u32);
    }
    sig
}
