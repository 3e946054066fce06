//! [`BackendT`] implementation backed by OP-TEE through libteec.

use optee_teec::{ConnectionMethods, Context, Operation, ParamNone, ParamTmpRef, Session};
use signer_proto::{CommandId, TeeStatus};
use uuid::Uuid;

use crate::error::{Error, InvokeFailure, Result};
use crate::{BackendT, SessionT};

/// The real platform: contexts and sessions come from the OP-TEE client
/// library, and dropping them releases the underlying handles.
pub struct OpteeBackend;

pub struct OpteeSession(Session);

impl BackendT for OpteeBackend {
    type Context = Context;
    type Session = OpteeSession;

    fn initialize_context(&mut self) -> Result<Context> {
        Context::new().map_err(|err| Error::ContextInit {
            status: TeeStatus(err.raw_code()),
        })
    }

    fn open_session(&mut self, ctx: &mut Context, identity: &Uuid) -> Result<OpteeSession> {
        let uuid =
            optee_teec::Uuid::parse_str(&identity.to_string()).expect("uuid is well formed");
        let session = Session::new(
            ctx,
            uuid,
            ConnectionMethods::LoginPublic,
            None::<&mut Operation<ParamNone, ParamNone, ParamNone, ParamNone>>,
        )
        // The wrapper does not surface the error origin, so it is reported
        // as unknown.
        .map_err(|err| Error::SessionOpen {
            status: TeeStatus(err.raw_code()),
            origin: None,
        })?;

        Ok(OpteeSession(session))
    }
}

impl SessionT for OpteeSession {
    fn invoke(
        &mut self,
        command: CommandId,
        request: &[u8],
        response_buf: &mut [u8],
    ) -> std::result::Result<usize, InvokeFailure> {
        let prequest = ParamTmpRef::new_input(request);
        let presponse = ParamTmpRef::new_output(response_buf);
        let mut operation = Operation::new(0, prequest, presponse, ParamNone, ParamNone);

        self.0
            .invoke_command(u32::from(command), &mut operation)
            .map_err(|err| InvokeFailure {
                status: TeeStatus(err.raw_code()),
                origin: None,
            })?;

        Ok(operation.parameters().1.updated_size())
    }
}
