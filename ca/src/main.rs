#![forbid(unsafe_code)]

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr as _;

use signer_ca::{optee::OpteeBackend, Client};
use signer_proto::CommandId;

/// Largest response any signer command produces today is a signature; leave
/// generous headroom.
const RESPONSE_BUF_LEN: usize = 1024;

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    args.run()
}

#[derive(Debug, Parser)]
enum Args {
    /// Generate a fresh keypair inside the TA and print the public key.
    Generate,
    /// List the public keys held by the TA.
    Keys,
    /// Sign a hex-encoded message and print the signature.
    Sign(SignArgs),
}

impl Args {
    fn run(self) -> Result<()> {
        match self {
            Self::Generate => run_command(CommandId::GenerateNew, &[]),
            Self::Keys => run_command(CommandId::GetKeys, &[]),
            Self::Sign(args) => args.run(),
        }
    }
}

#[derive(Debug, Parser)]
struct SignArgs {
    /// Hex-encoded message payload.
    message: String,
}

impl SignArgs {
    fn run(self) -> Result<()> {
        let message = hex::decode(&self.message).wrap_err("message is not valid hex")?;

        run_command(CommandId::SignMessage, &message)
    }
}

fn run_command(command: CommandId, request: &[u8]) -> Result<()> {
    let mut client = make_client()?;
    let mut response = vec![0u8; RESPONSE_BUF_LEN];

    // A panic inside the TA severs the session; by the time the client
    // reports it, a fresh session is already in place, so one retry is safe.
    let nbytes = client
        .invoke_with_retry(command, request, &mut response)
        .wrap_err("failed to invoke signer command")?;
    println!("{}", hex::encode(&response[..nbytes]));

    Ok(())
}

fn make_client() -> Result<Client<OpteeBackend>> {
    Client::connect(OpteeBackend).wrap_err("failed to connect to the signer TA")
}
