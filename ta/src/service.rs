//! Seam between the entry router and the signing engine.

use signer_proto::{CommandId, HandleSecureCommand, ServiceError};

/// Command handler for the signer service.
///
/// The cryptographic engine is linked in from the key-management crate in
/// production TA images; this default build rejects every command so the
/// session and dispatch plumbing can be exercised on its own.
#[derive(Default)]
pub struct SignerApp;

impl HandleSecureCommand for SignerApp {
    fn process_command(
        &mut self,
        cmd: CommandId,
        _input: &[u8],
        _output: &mut [u8],
    ) -> Result<usize, ServiceError> {
        match cmd {
            CommandId::GenerateNew | CommandId::GetKeys | CommandId::SignMessage => {
                Err(ServiceError::NotSupported)
            }
        }
    }
}
