//! Types shared between the host-side client and the signer TA.

#![cfg_attr(not(test), no_std)]

use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Commands understood by the signer TA.
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum CommandId {
    GenerateNew = 0,
    GetKeys = 1,
    SignMessage = 2,
}

// If Uuid::parse_str() rejects this with an InvalidLength error, uuid.txt
// probably grew a trailing newline. `truncate -s 36 uuid.txt` fixes it.
pub const TA_UUID: &str = include_str!("../../uuid.txt");

/// Raw status word from the TEE client API error space.
///
/// Codes follow the GlobalPlatform `TEE_ERROR_*` assignments.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct TeeStatus(pub u32);

impl TeeStatus {
    pub const GENERIC: Self = Self(0xFFFF_0000);
    pub const ACCESS_DENIED: Self = Self(0xFFFF_0001);
    pub const CANCEL: Self = Self(0xFFFF_0002);
    pub const ACCESS_CONFLICT: Self = Self(0xFFFF_0003);
    pub const EXCESS_DATA: Self = Self(0xFFFF_0004);
    pub const BAD_FORMAT: Self = Self(0xFFFF_0005);
    pub const BAD_PARAMETERS: Self = Self(0xFFFF_0006);
    pub const BAD_STATE: Self = Self(0xFFFF_0007);
    pub const ITEM_NOT_FOUND: Self = Self(0xFFFF_0008);
    pub const NOT_IMPLEMENTED: Self = Self(0xFFFF_0009);
    pub const NOT_SUPPORTED: Self = Self(0xFFFF_000A);
    pub const NO_DATA: Self = Self(0xFFFF_000B);
    pub const OUT_OF_MEMORY: Self = Self(0xFFFF_000C);
    pub const BUSY: Self = Self(0xFFFF_000D);
    pub const COMMUNICATION: Self = Self(0xFFFF_000E);
    pub const SECURITY: Self = Self(0xFFFF_000F);
    pub const SHORT_BUFFER: Self = Self(0xFFFF_0010);
    pub const EXTERNAL_CANCEL: Self = Self(0xFFFF_0011);
    /// The trusted application has panicked during the operation.
    pub const TARGET_DEAD: Self = Self(0xFFFF_3024);

    /// Whether this status is the distinguished "service instance died"
    /// signal, as opposed to an ordinary command-level error.
    #[must_use]
    pub fn is_target_dead(self) -> bool {
        self == Self::TARGET_DEAD
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::GENERIC => "non-specific cause",
            Self::ACCESS_DENIED => "access privileges are not sufficient",
            Self::CANCEL => "the operation was canceled",
            Self::ACCESS_CONFLICT => "concurrent accesses caused conflict",
            Self::EXCESS_DATA => "too much data for the requested operation",
            Self::BAD_FORMAT => "input data was of invalid format",
            Self::BAD_PARAMETERS => "input parameters were invalid",
            Self::BAD_STATE => "operation is not valid in the current state",
            Self::ITEM_NOT_FOUND => "the requested data item is not found",
            Self::NOT_IMPLEMENTED => "the requested operation is not yet implemented",
            Self::NOT_SUPPORTED => "the requested operation is not supported",
            Self::NO_DATA => "expected data was missing",
            Self::OUT_OF_MEMORY => "system ran out of resources",
            Self::BUSY => "the system is busy working on something else",
            Self::COMMUNICATION => "communication with a remote party failed",
            Self::SECURITY => "a security fault was detected",
            Self::SHORT_BUFFER => "the supplied buffer is too short for the output",
            Self::EXTERNAL_CANCEL => "the operation was canceled externally",
            Self::TARGET_DEAD => "the trusted application has panicked during the operation",
            Self(_) => "unknown status",
        }
    }
}

impl fmt::Display for TeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status 0x{:08x})", self.message(), self.0)
    }
}

impl fmt::Debug for TeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TeeStatus(0x{:08x})", self.0)
    }
}

/// Which protocol layer produced a status word (`TEEC_ORIGIN_*`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum Origin {
    Api = 1,
    Comms = 2,
    Tee = 3,
    TrustedApp = 4,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::Api => "the client API layer",
            Origin::Comms => "the communication layer",
            Origin::Tee => "the TEE core",
            Origin::TrustedApp => "the trusted application",
        };
        f.write_str(name)
    }
}

/// Errors a command handler may report back to the entry router.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ServiceError {
    BadParameters,
    ItemNotFound,
    NotSupported,
    ShortBuffer,
    Generic,
}

impl From<ServiceError> for TeeStatus {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::BadParameters => TeeStatus::BAD_PARAMETERS,
            ServiceError::ItemNotFound => TeeStatus::ITEM_NOT_FOUND,
            ServiceError::NotSupported => TeeStatus::NOT_SUPPORTED,
            ServiceError::ShortBuffer => TeeStatus::SHORT_BUFFER,
            ServiceError::Generic => TeeStatus::GENERIC,
        }
    }
}

/// Implemented by the service behind the secure-world entry router.
///
/// The router hands over the raw request bytes and a response buffer; the
/// handler returns how many response bytes it wrote.
pub trait HandleSecureCommand {
    fn process_command(
        &mut self,
        cmd: CommandId,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ids_round_trip() {
        for cmd in [CommandId::GenerateNew, CommandId::GetKeys, CommandId::SignMessage] {
            assert_eq!(CommandId::try_from(u32::from(cmd)), Ok(cmd));
        }
        assert!(CommandId::try_from(3u32).is_err());
    }

    #[test]
    fn target_dead_is_distinguished() {
        assert!(TeeStatus::TARGET_DEAD.is_target_dead());
        assert!(!TeeStatus::COMMUNICATION.is_target_dead());
        assert!(!TeeStatus(0xFFFF_3025).is_target_dead());
    }

    #[test]
    fn ta_uuid_is_well_formed() {
        assert_eq!(TA_UUID.len(), 36);
        assert!(!TA_UUID.ends_with('\n'));
    }
}
