#![no_std]
#![no_main]

mod service;
mod trace;

extern crate alloc;

include!(concat!(env!("OUT_DIR"), "/user_ta_header.rs"));

use optee_utee::{
    ta_close_session, ta_create, ta_destroy, ta_invoke_command, ta_open_session,
};
use optee_utee::{Error as TeeError, ErrorKind, Parameters, Result as TeeResult};
use signer_proto::{CommandId, HandleSecureCommand as _, ServiceError};

use crate::service::SignerApp;

// The optee macros don't themselves unambiguously reference Box.
use alloc::boxed::Box;

/// Per-session state; built by the platform glue when a session opens.
#[derive(Default)]
struct Ctx {
    app: SignerApp,
}

#[ta_create]
fn create() -> TeeResult<()> {
    info!("TA created");
    Ok(())
}

#[ta_open_session]
fn open_session(_params: &mut Parameters, _ctx: &mut Ctx) -> TeeResult<()> {
    // No per-session setup; the parameters are reserved for future use.
    trace!("TA open session");
    Ok(())
}

#[ta_close_session]
fn close_session(_ctx: &mut Ctx) {
    trace!("TA close session");
}

#[ta_destroy]
fn destroy() {
    trace!("TA destroy");
}

#[ta_invoke_command]
fn invoke_command(ctx: &mut Ctx, cmd_id: u32, params: &mut Parameters) -> TeeResult<()> {
    let cmd: CommandId = cmd_id.try_into().map_err(|_| {
        error!("unknown command: {}", cmd_id);
        TeeError::new(ErrorKind::BadFormat)
    })?;

    // The command layout is fixed: request memref in, response memref out.
    let mut input = unsafe { params.0.as_memref() }?;
    let mut output = unsafe { params.1.as_memref() }?;

    let written = ctx
        .app
        .process_command(cmd, input.buffer(), output.buffer())
        .map_err(|err| {
            error!("command {:?} failed: {:?}", cmd, err);
            TeeError::new(error_kind(err))
        })?;
    output.set_updated_size(written);

    Ok(())
}

fn error_kind(err: ServiceError) -> ErrorKind {
    match err {
        ServiceError::BadParameters => ErrorKind::BadParameters,
        ServiceError::ItemNotFound => ErrorKind::ItemNotFound,
        ServiceError::NotSupported => ErrorKind::NotSupported,
        ServiceError::ShortBuffer => ErrorKind::ShortBuffer,
        ServiceError::Generic => ErrorKind::Generic,
    }
}
