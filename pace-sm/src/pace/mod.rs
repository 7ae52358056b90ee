//! Password Authenticated Connection Establishment (PACE) with Generic Mapping over elliptic
//! curves.
//!
//! Specified in BSI TR-03110 Part 2 § 3.2 and ICAO Doc 9303 Part 11 § 4.4.


pub mod apdus;
pub mod asn1;
pub mod crypto_suite;
pub mod kdf;
pub mod oids;
pub mod process;


use std::fmt;
use std::str::FromStr;

use rasn::types::ObjectIdentifier;
use zeroize::Zeroizing;

use crate::crypt;
use crate::iso7816::card::{CommunicationError, TransportFailure};
use crate::iso7816::status::StatusWord;


/// A round trip of the PACE protocol.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Step {
    /// MANAGE SECURITY ENVIRONMENT: Set Authentication Template.
    MseSetAt,
    /// GENERAL AUTHENTICATE returning the encrypted nonce.
    EncryptedNonce,
    /// GENERAL AUTHENTICATE exchanging the mapping public keys.
    MapNonce,
    /// GENERAL AUTHENTICATE exchanging the ephemeral public keys.
    KeyAgreement,
    /// GENERAL AUTHENTICATE exchanging the authentication tokens.
    MutualAuthentication,
}
impl Step {
    /// The result code reporting a failure of this step with the given status word.
    pub const fn result_code(&self, sw: u16) -> PaceResultCode {
        match self {
            Self::MseSetAt => PaceResultCode::MseSetAtError(sw),
            Self::EncryptedNonce => PaceResultCode::Ga1Error(sw),
            Self::MapNonce => PaceResultCode::Ga2Error(sw),
            Self::KeyAgreement => PaceResultCode::Ga3Error(sw),
            Self::MutualAuthentication => PaceResultCode::Ga4Error(sw),
        }
    }
}
impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MseSetAt => "MSE:Set AT",
            Self::EncryptedNonce => "GENERAL AUTHENTICATE (encrypted nonce)",
            Self::MapNonce => "GENERAL AUTHENTICATE (map nonce)",
            Self::KeyAgreement => "GENERAL AUTHENTICATE (key agreement)",
            Self::MutualAuthentication => "GENERAL AUTHENTICATE (mutual authentication)",
        };
        f.write_str(name)
    }
}


/// Stable numeric codes for the outcome of a PACE run.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PaceResultCode {
    TlvResponseSyntax,
    UnexpectedTlvResponseObject,
    UnknownPin,
    WrongAuthToken,
    MseSetAtError(u16),
    Ga1Error(u16),
    Ga2Error(u16),
    Ga3Error(u16),
    Ga4Error(u16),
    ComAbort,
    NoCard,
    Abort,
    Timeout,
}
impl PaceResultCode {
    pub const fn code(&self) -> u32 {
        match self {
            Self::TlvResponseSyntax => 0xE000_0001,
            Self::UnexpectedTlvResponseObject => 0xE000_0002,
            Self::UnknownPin => 0xE000_0003,
            Self::WrongAuthToken => 0xE000_0006,
            Self::MseSetAtError(sw) => 0xF002_0000 | (*sw as u32),
            Self::Ga1Error(sw) => 0xF003_0000 | (*sw as u32),
            Self::Ga2Error(sw) => 0xF004_0000 | (*sw as u32),
            Self::Ga3Error(sw) => 0xF005_0000 | (*sw as u32),
            Self::Ga4Error(sw) => 0xF006_0000 | (*sw as u32),
            Self::ComAbort => 0xF010_0001,
            Self::NoCard => 0xF010_0002,
            Self::Abort => 0xF020_0001,
            Self::Timeout => 0xF020_0002,
        }
    }
}
impl fmt::Display for PaceResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.code())
    }
}


#[derive(Debug)]
pub enum Error {
    /// EF.CardAccess lists no PACE protocol.
    NotSupported,
    /// EF.CardAccess lists only PACE protocols with unsupported mappings or ciphers.
    MappingNotSupported { protocol: ObjectIdentifier },
    CardAccessDecoding(rasn::error::DecodeError),
    CardAccessStructure,
    /// The card uses explicit domain parameters instead of a standardized parameter ID.
    CustomParameters,
    IncompatibleProtocolParameter { protocol: ObjectIdentifier, parameter: u32 },
    /// The password contains characters outside ISO/IEC 8859-1.
    PasswordEncoding,
    Communication { step: Step, error: CommunicationError },
    OperationFailed { step: Step, status: StatusWord },
    /// The retry counter of the password is exhausted.
    PinBlocked { step: Step },
    /// One try is left and the password has to be resumed using the CAN first.
    PinSuspended { step: Step },
    PinDeactivated { step: Step },
    WrongPassword { step: Step, remaining: u8 },
    TlvSyntax { step: Step },
    MissingObject { step: Step, tag: u8 },
    NonceDecryption(crypt::Error),
    KeysEqual { step: Step },
    InvalidPublicKey { step: Step },
    MutualAuthentication,
    Crypto { step: Step, error: crypt::Error },
}
impl Error {
    /// Maps the error onto the PACE result code taxonomy.
    pub fn result_code(&self) -> PaceResultCode {
        match self {
            Self::NotSupported
            | Self::MappingNotSupported { .. }
            | Self::CardAccessDecoding(_)
            | Self::CardAccessStructure
            | Self::CustomParameters
            | Self::IncompatibleProtocolParameter { .. }
                => PaceResultCode::MseSetAtError(0),
            Self::PasswordEncoding => PaceResultCode::UnknownPin,
            Self::Communication { error, .. } => match error.failure_kind() {
                TransportFailure::NoCard => PaceResultCode::NoCard,
                TransportFailure::Timeout => PaceResultCode::Timeout,
                TransportFailure::Cancelled => PaceResultCode::Abort,
                TransportFailure::Other => PaceResultCode::ComAbort,
            },
            Self::OperationFailed { step, status } => step.result_code(status.sw()),
            Self::PinBlocked { step } => step.result_code(0x63C0),
            Self::PinSuspended { step } => step.result_code(0x63C1),
            Self::PinDeactivated { step } => step.result_code(0x6283),
            Self::WrongPassword { step, remaining } => step.result_code(0x63C0 | u16::from(*remaining & 0x0F)),
            Self::TlvSyntax { .. } => PaceResultCode::TlvResponseSyntax,
            Self::MissingObject { .. } => PaceResultCode::UnexpectedTlvResponseObject,
            Self::NonceDecryption(_) => PaceResultCode::Ga1Error(0),
            Self::KeysEqual { step }
            | Self::InvalidPublicKey { step }
            | Self::Crypto { step, .. }
                => step.result_code(0),
            Self::MutualAuthentication => PaceResultCode::WrongAuthToken,
        }
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported
                => write!(f, "the card does not support PACE"),
            Self::MappingNotSupported { protocol }
                => write!(f, "PACE protocol {:?} is not supported", protocol),
            Self::CardAccessDecoding(e)
                => write!(f, "failed to decode EF.CardAccess: {}", e),
            Self::CardAccessStructure
                => write!(f, "EF.CardAccess is not a SET OF SecurityInfo"),
            Self::CustomParameters
                => write!(f, "explicit domain parameters are not supported"),
            Self::IncompatibleProtocolParameter { protocol, parameter }
                => write!(f, "protocol {:?} is incompatible with parameter {}", protocol, parameter),
            Self::PasswordEncoding
                => write!(f, "password cannot be encoded in ISO/IEC 8859-1"),
            Self::Communication { step, error }
                => write!(f, "communication failed during {}: {}", step, error),
            Self::OperationFailed { step, status }
                => write!(f, "{} failed: {}", step, status),
            Self::PinBlocked { step }
                => write!(f, "password is blocked ({})", step),
            Self::PinSuspended { step }
                => write!(f, "password is suspended and must be resumed ({})", step),
            Self::PinDeactivated { step }
                => write!(f, "password is deactivated ({})", step),
            Self::WrongPassword { step, remaining }
                => write!(f, "wrong password ({} tries remaining, {})", remaining, step),
            Self::TlvSyntax { step }
                => write!(f, "response to {} is not valid dynamic authentication data", step),
            Self::MissingObject { step, tag }
                => write!(f, "response to {} lacks data object 0x{:02X}", step, tag),
            Self::NonceDecryption(e)
                => write!(f, "failed to decrypt nonce: {}", e),
            Self::KeysEqual { step }
                => write!(f, "card returned the terminal's own public key during {}", step),
            Self::InvalidPublicKey { step }
                => write!(f, "card returned an invalid public key during {}", step),
            Self::MutualAuthentication
                => write!(f, "card authentication token is wrong"),
            Self::Crypto { step, error }
                => write!(f, "cryptographic operation failed during {}: {}", step, error),
        }
    }
}
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Communication { error, .. } => Some(error),
            Self::NonceDecryption(e) => Some(e),
            Self::Crypto { error, .. } => Some(error),
            _ => None,
        }
    }
}


/// The password used for PACE, as referenced in MSE:Set AT.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PacePinId {
    /// Machine Readable Zone.
    Mrz,
    /// Card Access Number.
    Can,
    Pin,
    Puk,
}
impl PacePinId {
    pub const fn reference(&self) -> u8 {
        match self {
            Self::Mrz => 0x01,
            Self::Can => 0x02,
            Self::Pin => 0x03,
            Self::Puk => 0x04,
        }
    }

    pub const fn from_reference(reference: u8) -> Option<Self> {
        match reference {
            0x01 => Some(Self::Mrz),
            0x02 => Some(Self::Can),
            0x03 => Some(Self::Pin),
            0x04 => Some(Self::Puk),
            _ => None,
        }
    }
}
impl FromStr for PacePinId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mrz" => Ok(Self::Mrz),
            "can" => Ok(Self::Can),
            "pin" => Ok(Self::Pin),
            "puk" => Ok(Self::Puk),
            other => Err(format!("unknown password type {:?} (expected mrz, can, pin or puk)", other)),
        }
    }
}


/// The outcome of MSE:Set AT when it does not abort the run.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MseStatus {
    Success,
    /// The card accepted the template but reports a reduced retry counter for the password.
    Retry { remaining: u8 },
    /// The PIN is blocked and the PUK was selected to unblock it.
    Blocked,
}


/// The inputs of a PACE run.
#[derive(Clone)]
pub struct PaceParameters {
    pub pin_id: PacePinId,
    pub password: Zeroizing<String>,

    /// Certificate Holder Authorization Template, without its `7F4C` tag and length.
    pub chat: Option<Vec<u8>>,

    /// Certificate description, without its `73` tag and length.
    pub certificate_description: Option<Vec<u8>>,

    /// Replaces the standardized domain parameter ID announced in EF.CardAccess.
    pub parameter_id: Option<u8>,
}
impl PaceParameters {
    pub fn new(pin_id: PacePinId, password: &str) -> Self {
        Self {
            pin_id,
            password: Zeroizing::new(password.to_owned()),
            chat: None,
            certificate_description: None,
            parameter_id: None,
        }
    }

    pub fn with_chat(mut self, chat: Vec<u8>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_certificate_description(mut self, certificate_description: Vec<u8>) -> Self {
        self.certificate_description = Some(certificate_description);
        self
    }

    pub fn with_parameter_id(mut self, parameter_id: u8) -> Self {
        self.parameter_id = Some(parameter_id);
        self
    }
}
impl fmt::Debug for PaceParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaceParameters")
            .field("pin_id", &self.pin_id)
            .field("password", &"<redacted>")
            .field("chat", &self.chat)
            .field("certificate_description", &self.certificate_description)
            .field("parameter_id", &self.parameter_id)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes() {
        assert_eq!(PaceResultCode::TlvResponseSyntax.code(), 0xE000_0001);
        assert_eq!(PaceResultCode::MseSetAtError(0x6A80).code(), 0xF002_6A80);
        assert_eq!(PaceResultCode::Ga4Error(0x63C2).code(), 0xF006_63C2);
        assert_eq!(PaceResultCode::Timeout.to_string(), "0xF0200002");
    }

    #[test]
    fn errors_map_to_codes() {
        let failed = Error::OperationFailed { step: Step::KeyAgreement, status: StatusWord::from_word(0x6300) };
        assert_eq!(failed.result_code().code(), 0xF005_6300);
        assert_eq!(Error::WrongPassword { step: Step::MutualAuthentication, remaining: 2 }.result_code().code(), 0xF006_63C2);
        assert_eq!(Error::PinBlocked { step: Step::MseSetAt }.result_code(), PaceResultCode::MseSetAtError(0x63C0));
        assert_eq!(Error::PinSuspended { step: Step::EncryptedNonce }.result_code().code(), 0xF003_63C1);
        assert_eq!(Error::PinDeactivated { step: Step::MutualAuthentication }.result_code().code(), 0xF006_6283);
        assert_eq!(Error::KeysEqual { step: Step::MapNonce }.result_code().code(), 0xF004_0000);
        assert_eq!(Error::MutualAuthentication.result_code(), PaceResultCode::WrongAuthToken);
        assert_eq!(Error::MissingObject { step: Step::MutualAuthentication, tag: 0x87 }.result_code(), PaceResultCode::UnexpectedTlvResponseObject);

        let no_card = Error::Communication { step: Step::EncryptedNonce, error: CommunicationError::NoCard };
        assert_eq!(no_card.result_code(), PaceResultCode::NoCard);
        let cancelled = Error::Communication { step: Step::EncryptedNonce, error: CommunicationError::Cancelled };
        assert_eq!(cancelled.result_code(), PaceResultCode::Abort);
    }

    #[test]
    fn pin_ids() {
        assert_eq!(PacePinId::Can.reference(), 0x02);
        assert_eq!(PacePinId::from_reference(0x04), Some(PacePinId::Puk));
        assert_eq!("PIN".parse::<PacePinId>(), Ok(PacePinId::Pin));
        assert!("password".parse::<PacePinId>().is_err());
    }

    #[test]
    fn parameters_hide_password() {
        let parameters = PaceParameters::new(PacePinId::Can, "123456");
        assert!(!format!("{:?}", parameters).contains("123456"));
    }
}
