use optee_utee_build::{Error, RustEdition, TaConfig};
use uuid::Uuid;

fn main() -> Result<(), Error> {
    let uuid = Uuid::parse_str(signer_proto::TA_UUID).expect("uuid.txt holds a valid uuid");
    let config = TaConfig::new_default_with_cargo_env(uuid)?;
    optee_utee_build::build(RustEdition::Edition2024, config)
}
