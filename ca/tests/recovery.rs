//! Session lifecycle and panic-recovery behavior, exercised against the
//! in-memory backend.

#![cfg(feature = "backend-in-memory")]

use signer_ca::in_memory::{Event, InMemoryBackend};
use signer_ca::{error::Error, Client, ClientState};
use signer_proto::{CommandId, Origin, TeeStatus};

fn connect(backend: &InMemoryBackend) -> Client<InMemoryBackend> {
    Client::connect(backend.clone()).expect("connect against the fake platform")
}

#[test]
fn it_passes_the_service_result_through_unchanged() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    let mut buf = [0u8; 128];

    let nbytes = client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap();
    assert_eq!(nbytes, 64);
    let signature = buf[..nbytes].to_vec();

    // Same message, same session, same signature.
    let nbytes = client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap();
    assert_eq!(&buf[..nbytes], signature.as_slice());
}

#[test]
fn it_keeps_the_session_across_successful_invokes() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    let mut buf = [0u8; 128];

    for _ in 0..3 {
        client
            .invoke(CommandId::GenerateNew, &[], &mut buf)
            .unwrap();
    }

    // One context, one session, three invokes on it; no implicit recovery.
    assert_eq!(
        backend.events(),
        vec![
            Event::InitializeContext,
            Event::OpenSession { session: 0 },
            Event::Invoke {
                session: 0,
                command: CommandId::GenerateNew
            },
            Event::Invoke {
                session: 0,
                command: CommandId::GenerateNew
            },
            Event::Invoke {
                session: 0,
                command: CommandId::GenerateNew
            },
        ],
    );
}

#[test]
fn it_fails_fast_after_close_without_touching_the_platform() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    client.close();

    let ledger_before = backend.events();
    let mut buf = [0u8; 128];
    let err = client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap_err();

    assert!(matches!(err, Error::NoActiveSession));
    assert_eq!(backend.events(), ledger_before);
}

#[test]
fn it_leaves_nothing_open_after_a_connect_close_round_trip() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    client.close();

    assert_eq!(
        backend.events(),
        vec![
            Event::InitializeContext,
            Event::OpenSession { session: 0 },
            Event::CloseSession { session: 0 },
            Event::FinalizeContext,
        ],
    );
}

#[test]
fn it_rebuilds_context_and_session_after_a_service_panic() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    let mut buf = [0u8; 128];

    backend.fail_next_invoke(TeeStatus::TARGET_DEAD, Origin::Comms);
    let err = client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap_err();
    assert!(matches!(err, Error::ServicePanic));
    assert_eq!(client.state(), ClientState::Active);

    // Exactly one close, one finalize, one init, one open, in that order.
    assert_eq!(
        backend.events(),
        vec![
            Event::InitializeContext,
            Event::OpenSession { session: 0 },
            Event::Invoke {
                session: 0,
                command: CommandId::SignMessage
            },
            Event::CloseSession { session: 0 },
            Event::FinalizeContext,
            Event::InitializeContext,
            Event::OpenSession { session: 1 },
        ],
    );

    // The retried command runs on the fresh session, not the dead one.
    client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap();
    assert_eq!(
        backend.events().last(),
        Some(&Event::Invoke {
            session: 1,
            command: CommandId::SignMessage
        }),
    );
}

#[test]
fn it_retries_once_after_recovery() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    let mut buf = [0u8; 128];

    backend.fail_next_invoke(TeeStatus::TARGET_DEAD, Origin::Comms);
    let nbytes = client
        .invoke_with_retry(CommandId::SignMessage, b"message", &mut buf)
        .unwrap();
    assert_eq!(nbytes, 64);
    assert_eq!(
        backend.events().last(),
        Some(&Event::Invoke {
            session: 1,
            command: CommandId::SignMessage
        }),
    );
}

#[test]
fn it_fails_permanently_when_recovery_cannot_reopen() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    let mut buf = [0u8; 128];

    backend.fail_next_invoke(TeeStatus::TARGET_DEAD, Origin::Comms);
    backend.fail_next_open(TeeStatus::ITEM_NOT_FOUND, Origin::Tee);

    let err = client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap_err();
    match &err {
        Error::SessionOpen { status, origin } => {
            assert_eq!(*status, TeeStatus::ITEM_NOT_FOUND);
            assert_eq!(*origin, Some(Origin::Tee));
        }
        other => panic!("expected a session-open failure, got {other:?}"),
    }
    assert!(err.is_fatal());
    assert_eq!(client.state(), ClientState::Failed);

    // No further invoke succeeds and no second recovery is attempted.
    let ledger_before = backend.events();
    let err = client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap_err();
    assert!(matches!(err, Error::NoActiveSession));
    assert_eq!(backend.events(), ledger_before);
}

#[test]
fn it_fails_permanently_when_recovery_cannot_reinitialize() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    let mut buf = [0u8; 128];

    backend.fail_next_invoke(TeeStatus::TARGET_DEAD, Origin::Comms);
    backend.fail_next_initialize(TeeStatus::COMMUNICATION);

    let err = client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap_err();
    match &err {
        Error::ContextInit { status } => assert_eq!(*status, TeeStatus::COMMUNICATION),
        other => panic!("expected a context-init failure, got {other:?}"),
    }
    assert!(err.is_fatal());
    assert_eq!(client.state(), ClientState::Failed);

    // The dead pair was torn down in order, and nothing came up after it.
    assert_eq!(
        backend.events(),
        vec![
            Event::InitializeContext,
            Event::OpenSession { session: 0 },
            Event::Invoke {
                session: 0,
                command: CommandId::SignMessage
            },
            Event::CloseSession { session: 0 },
            Event::FinalizeContext,
        ],
    );
}

#[test]
fn it_does_not_recover_on_ordinary_command_errors() {
    let backend = InMemoryBackend::new();
    let mut client = connect(&backend);
    let mut buf = [0u8; 128];

    backend.fail_next_invoke(TeeStatus::BAD_PARAMETERS, Origin::TrustedApp);
    let err = client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap_err();
    match &err {
        Error::Command { status, origin } => {
            assert_eq!(*status, TeeStatus::BAD_PARAMETERS);
            assert_eq!(*origin, Some(Origin::TrustedApp));
        }
        other => panic!("expected a command error, got {other:?}"),
    }
    assert!(!err.is_fatal());
    assert_eq!(client.state(), ClientState::Active);

    // Same session keeps working; the ledger shows no teardown.
    client
        .invoke(CommandId::SignMessage, b"message", &mut buf)
        .unwrap();
    let events = backend.events();
    assert!(!events.contains(&Event::FinalizeContext));
    assert_eq!(
        events.last(),
        Some(&Event::Invoke {
            session: 0,
            command: CommandId::SignMessage
        }),
    );
}
