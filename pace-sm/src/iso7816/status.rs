//! Classification of response status words (SW1-SW2).


use std::fmt;

use tracing::Level;


/// A status word as defined by ISO/IEC 7816-4:2020 § 5.6.
///
/// Status words that carry a parameter in SW2 (bytes available, counter values, exact length) keep
/// that parameter in their variant.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum StatusWord {
    /// `9000`
    Success,
    /// `61xx`
    BytesAvailable(u8),

    /// `6200`
    WarningUnchanged,
    /// `6281`
    PartOfDataCorrupted,
    /// `6282`
    EndOfFileReached,
    /// `6283`
    SelectedFileDeactivated,
    /// `6284`
    FileControlInformationFormat,
    /// other `62xx`
    WarningUnchangedOther(u8),

    /// `6300`
    VerificationFailed,
    /// `6381`
    FileFilledUp,
    /// `63Cx`
    CounterValue(u8),
    /// other `63xx`
    WarningChangedOther(u8),

    /// `64xx`, `65xx`, `66xx`
    ExecutionError(u8, u8),

    /// `6700`
    WrongLength,

    /// `6881`
    LogicalChannelNotSupported,
    /// `6882`
    SecureMessagingNotSupported,
    /// `6883`
    LastCommandOfChainExpected,
    /// `6884`
    CommandChainingNotSupported,

    /// `6981`
    CommandIncompatibleWithFileStructure,
    /// `6982`
    SecurityStatusNotSatisfied,
    /// `6983`
    AuthenticationMethodBlocked,
    /// `6984`
    ReferenceDataNotUsable,
    /// `6985`
    ConditionsOfUseNotSatisfied,
    /// `6986`
    CommandNotAllowed,
    /// `6987`
    SmDataObjectsMissing,
    /// `6988`
    SmDataObjectsIncorrect,

    /// `6A80`
    IncorrectParametersInData,
    /// `6A81`
    FunctionNotSupported,
    /// `6A82`
    FileNotFound,
    /// `6A83`
    RecordNotFound,
    /// `6A84`
    NotEnoughMemory,
    /// `6A85`
    LengthInconsistentWithTlv,
    /// `6A86`
    IncorrectP1P2,
    /// `6A87`
    LengthInconsistentWithP1P2,
    /// `6A88`
    ReferencedDataNotFound,

    /// `6B00`
    WrongParametersP1P2,
    /// `6Cxx`
    WrongLe(u8),
    /// `6D00`
    InstructionNotSupported,
    /// `6E00`
    ClassNotSupported,
    /// `6F00`
    NoPreciseDiagnosis,

    Unknown(u8, u8),
}
impl StatusWord {
    pub const fn from_bytes(sw1: u8, sw2: u8) -> Self {
        match (sw1, sw2) {
            (0x90, 0x00) => Self::Success,
            (0x61, available) => Self::BytesAvailable(available),

            (0x62, 0x00) => Self::WarningUnchanged,
            (0x62, 0x81) => Self::PartOfDataCorrupted,
            (0x62, 0x82) => Self::EndOfFileReached,
            (0x62, 0x83) => Self::SelectedFileDeactivated,
            (0x62, 0x84) => Self::FileControlInformationFormat,
            (0x62, other) => Self::WarningUnchangedOther(other),

            (0x63, 0x00) => Self::VerificationFailed,
            (0x63, 0x81) => Self::FileFilledUp,
            (0x63, counter) if counter & 0xF0 == 0xC0 => Self::CounterValue(counter & 0x0F),
            (0x63, other) => Self::WarningChangedOther(other),

            (0x64..=0x66, _) => Self::ExecutionError(sw1, sw2),

            (0x67, 0x00) => Self::WrongLength,

            (0x68, 0x81) => Self::LogicalChannelNotSupported,
            (0x68, 0x82) => Self::SecureMessagingNotSupported,
            (0x68, 0x83) => Self::LastCommandOfChainExpected,
            (0x68, 0x84) => Self::CommandChainingNotSupported,

            (0x69, 0x81) => Self::CommandIncompatibleWithFileStructure,
            (0x69, 0x82) => Self::SecurityStatusNotSatisfied,
            (0x69, 0x83) => Self::AuthenticationMethodBlocked,
            (0x69, 0x84) => Self::ReferenceDataNotUsable,
            (0x69, 0x85) => Self::ConditionsOfUseNotSatisfied,
            (0x69, 0x86) => Self::CommandNotAllowed,
            (0x69, 0x87) => Self::SmDataObjectsMissing,
            (0x69, 0x88) => Self::SmDataObjectsIncorrect,

            (0x6A, 0x80) => Self::IncorrectParametersInData,
            (0x6A, 0x81) => Self::FunctionNotSupported,
            (0x6A, 0x82) => Self::FileNotFound,
            (0x6A, 0x83) => Self::RecordNotFound,
            (0x6A, 0x84) => Self::NotEnoughMemory,
            (0x6A, 0x85) => Self::LengthInconsistentWithTlv,
            (0x6A, 0x86) => Self::IncorrectP1P2,
            (0x6A, 0x87) => Self::LengthInconsistentWithP1P2,
            (0x6A, 0x88) => Self::ReferencedDataNotFound,

            (0x6B, 0x00) => Self::WrongParametersP1P2,
            (0x6C, exact) => Self::WrongLe(exact),
            (0x6D, 0x00) => Self::InstructionNotSupported,
            (0x6E, 0x00) => Self::ClassNotSupported,
            (0x6F, 0x00) => Self::NoPreciseDiagnosis,

            _ => Self::Unknown(sw1, sw2),
        }
    }

    pub const fn from_word(word: u16) -> Self {
        let bytes = word.to_be_bytes();
        Self::from_bytes(bytes[0], bytes[1])
    }

    pub const fn sw(&self) -> u16 {
        match self {
            Self::Success => 0x9000,
            Self::BytesAvailable(available) => 0x6100 | (*available as u16),
            Self::WarningUnchanged => 0x6200,
            Self::PartOfDataCorrupted => 0x6281,
            Self::EndOfFileReached => 0x6282,
            Self::SelectedFileDeactivated => 0x6283,
            Self::FileControlInformationFormat => 0x6284,
            Self::WarningUnchangedOther(other) => 0x6200 | (*other as u16),
            Self::VerificationFailed => 0x6300,
            Self::FileFilledUp => 0x6381,
            Self::CounterValue(counter) => 0x63C0 | (*counter as u16),
            Self::WarningChangedOther(other) => 0x6300 | (*other as u16),
            Self::ExecutionError(sw1, sw2) => u16::from_be_bytes([*sw1, *sw2]),
            Self::WrongLength => 0x6700,
            Self::LogicalChannelNotSupported => 0x6881,
            Self::SecureMessagingNotSupported => 0x6882,
            Self::LastCommandOfChainExpected => 0x6883,
            Self::CommandChainingNotSupported => 0x6884,
            Self::CommandIncompatibleWithFileStructure => 0x6981,
            Self::SecurityStatusNotSatisfied => 0x6982,
            Self::AuthenticationMethodBlocked => 0x6983,
            Self::ReferenceDataNotUsable => 0x6984,
            Self::ConditionsOfUseNotSatisfied => 0x6985,
            Self::CommandNotAllowed => 0x6986,
            Self::SmDataObjectsMissing => 0x6987,
            Self::SmDataObjectsIncorrect => 0x6988,
            Self::IncorrectParametersInData => 0x6A80,
            Self::FunctionNotSupported => 0x6A81,
            Self::FileNotFound => 0x6A82,
            Self::RecordNotFound => 0x6A83,
            Self::NotEnoughMemory => 0x6A84,
            Self::LengthInconsistentWithTlv => 0x6A85,
            Self::IncorrectP1P2 => 0x6A86,
            Self::LengthInconsistentWithP1P2 => 0x6A87,
            Self::ReferencedDataNotFound => 0x6A88,
            Self::WrongParametersP1P2 => 0x6B00,
            Self::WrongLe(exact) => 0x6C00 | (*exact as u16),
            Self::InstructionNotSupported => 0x6D00,
            Self::ClassNotSupported => 0x6E00,
            Self::NoPreciseDiagnosis => 0x6F00,
            Self::Unknown(sw1, sw2) => u16::from_be_bytes([*sw1, *sw2]),
        }
    }

    /// Normal processing: `9000` or `61xx`.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::BytesAvailable(_))
    }

    /// Warning processing: `62xx` or `63xx`.
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::WarningUnchanged
            | Self::PartOfDataCorrupted
            | Self::EndOfFileReached
            | Self::SelectedFileDeactivated
            | Self::FileControlInformationFormat
            | Self::WarningUnchangedOther(_)
            | Self::VerificationFailed
            | Self::FileFilledUp
            | Self::CounterValue(_)
            | Self::WarningChangedOther(_)
        )
    }

    /// The retry counter reported by `63Cx`.
    pub const fn retry_counter(&self) -> Option<u8> {
        match self {
            Self::CounterValue(counter) => Some(*counter),
            _ => None,
        }
    }

    /// Whether the card rejected the Secure Messaging envelope itself.
    pub const fn is_secure_messaging_rejection(&self) -> bool {
        matches!(
            self,
            Self::SecureMessagingNotSupported | Self::SmDataObjectsMissing | Self::SmDataObjectsIncorrect
        )
    }

    pub const fn tracing_level(&self) -> Level {
        if self.is_success() {
            Level::DEBUG
        } else if self.is_warning() {
            Level::INFO
        } else {
            Level::WARN
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::Success => "normal processing",
            Self::BytesAvailable(_) => "response bytes still available",
            Self::WarningUnchanged => "warning, state of non-volatile memory unchanged",
            Self::PartOfDataCorrupted => "part of returned data may be corrupted",
            Self::EndOfFileReached => "end of file or record reached before reading Ne bytes",
            Self::SelectedFileDeactivated => "selected file deactivated",
            Self::FileControlInformationFormat => "file control information not formatted correctly",
            Self::WarningUnchangedOther(_) => "warning, state of non-volatile memory unchanged",
            Self::VerificationFailed => "verification failed",
            Self::FileFilledUp => "file filled up by the last write",
            Self::CounterValue(_) => "verification failed, counter value given",
            Self::WarningChangedOther(_) => "warning, state of non-volatile memory changed",
            Self::ExecutionError(_, _) => "execution error",
            Self::WrongLength => "wrong length",
            Self::LogicalChannelNotSupported => "logical channel not supported",
            Self::SecureMessagingNotSupported => "secure messaging not supported",
            Self::LastCommandOfChainExpected => "last command of the chain expected",
            Self::CommandChainingNotSupported => "command chaining not supported",
            Self::CommandIncompatibleWithFileStructure => "command incompatible with file structure",
            Self::SecurityStatusNotSatisfied => "security status not satisfied",
            Self::AuthenticationMethodBlocked => "authentication method blocked",
            Self::ReferenceDataNotUsable => "reference data not usable",
            Self::ConditionsOfUseNotSatisfied => "conditions of use not satisfied",
            Self::CommandNotAllowed => "command not allowed, no current EF",
            Self::SmDataObjectsMissing => "expected secure messaging data objects missing",
            Self::SmDataObjectsIncorrect => "incorrect secure messaging data objects",
            Self::IncorrectParametersInData => "incorrect parameters in the command data field",
            Self::FunctionNotSupported => "function not supported",
            Self::FileNotFound => "file or application not found",
            Self::RecordNotFound => "record not found",
            Self::NotEnoughMemory => "not enough memory space in the file",
            Self::LengthInconsistentWithTlv => "Nc inconsistent with TLV structure",
            Self::IncorrectP1P2 => "incorrect parameters P1-P2",
            Self::LengthInconsistentWithP1P2 => "Nc inconsistent with parameters P1-P2",
            Self::ReferencedDataNotFound => "referenced data or reference data not found",
            Self::WrongParametersP1P2 => "wrong parameters P1-P2",
            Self::WrongLe(_) => "wrong Le field",
            Self::InstructionNotSupported => "instruction code not supported or invalid",
            Self::ClassNotSupported => "class not supported",
            Self::NoPreciseDiagnosis => "no precise diagnosis",
            Self::Unknown(_, _) => "unknown status",
        }
    }
}
impl From<u16> for StatusWord {
    fn from(word: u16) -> Self { Self::from_word(word) }
}
impl From<StatusWord> for u16 {
    fn from(status: StatusWord) -> Self { status.sw() }
}
impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} ({})", self.sw(), self.description())?;
        match self {
            Self::BytesAvailable(available) => write!(f, ", {} bytes", available),
            Self::CounterValue(counter) => write!(f, ", {} tries remaining", counter),
            Self::WrongLe(exact) => write!(f, ", {} bytes available", exact),
            _ => Ok(()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::StatusWord;

    #[test]
    fn classification_round_trips() {
        for sw1 in 0x60..=0x6Fu8 {
            for sw2 in 0x00..=0xFFu8 {
                let status = StatusWord::from_bytes(sw1, sw2);
                assert_eq!(status.sw(), u16::from_be_bytes([sw1, sw2]));
            }
        }
        for sw2 in 0x00..=0xFFu8 {
            assert_eq!(StatusWord::from_bytes(0x90, sw2).sw(), u16::from_be_bytes([0x90, sw2]));
        }
    }

    #[test]
    fn counters_and_masks() {
        assert_eq!(StatusWord::from_word(0x63C2), StatusWord::CounterValue(2));
        assert_eq!(StatusWord::from_word(0x63C2).retry_counter(), Some(2));
        assert_eq!(StatusWord::from_word(0x63C0).retry_counter(), Some(0));
        assert_eq!(StatusWord::from_word(0x6310), StatusWord::WarningChangedOther(0x10));
        assert_eq!(StatusWord::from_word(0x6C20), StatusWord::WrongLe(0x20));
        assert_eq!(StatusWord::from_word(0x6283), StatusWord::SelectedFileDeactivated);
    }

    #[test]
    fn categories() {
        assert!(StatusWord::Success.is_success());
        assert!(StatusWord::BytesAvailable(0x10).is_success());
        assert!(StatusWord::CounterValue(1).is_warning());
        assert!(!StatusWord::FileNotFound.is_warning());
        assert!(StatusWord::from_word(0x6988).is_secure_messaging_rejection());
        assert!(StatusWord::from_word(0x6882).is_secure_messaging_rejection());
        assert!(!StatusWord::from_word(0x6982).is_secure_messaging_rejection());
        assert_eq!(StatusWord::from_word(0x6A82).description(), "file or application not found");
        assert_eq!(format!("{}", StatusWord::CounterValue(2)), "63C2 (verification failed, counter value given), 2 tries remaining");
    }
}
