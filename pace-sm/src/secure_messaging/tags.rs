//! Tags of the Secure Messaging data objects.
//!
//! Specified in ISO/IEC 7816-4:2020 § 10.2. The lowest bit of each tag states whether the object is
//! included in the cryptographic checksum: odd tags are authenticated, even tags are not.


/// A Secure Messaging data object type, independent of whether it is authenticated.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SmTag {
    /// Plain value not encoded in BER-TLV (`80`/`81`).
    PlainValue,
    /// Cryptogram of plain data not encoded in BER-TLV (`84`/`85`).
    Cryptogram,
    /// Padding-content indicator byte followed by a cryptogram (`86`/`87`).
    PaddingIndicatorCryptogram,
    /// Command header (`88`/`89`).
    CommandHeader,
    /// Cryptographic checksum (`8E`); never itself authenticated.
    CryptographicChecksum,
    /// Expected length Le (`96`/`97`).
    ExpectedLength,
    /// Processing status SW1-SW2 (`98`/`99`).
    ProcessingStatus,
}
impl SmTag {
    /// The tag byte of this data object.
    pub const fn tag(&self, authenticated: bool) -> u8 {
        let even = match self {
            Self::PlainValue => 0x80,
            Self::Cryptogram => 0x84,
            Self::PaddingIndicatorCryptogram => 0x86,
            Self::CommandHeader => 0x88,
            Self::CryptographicChecksum => return 0x8E,
            Self::ExpectedLength => 0x96,
            Self::ProcessingStatus => 0x98,
        };
        if authenticated { even | 0x01 } else { even }
    }

    /// Classifies a tag byte.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x8E => Some(Self::CryptographicChecksum),
            0x80|0x81 => Some(Self::PlainValue),
            0x84|0x85 => Some(Self::Cryptogram),
            0x86|0x87 => Some(Self::PaddingIndicatorCryptogram),
            0x88|0x89 => Some(Self::CommandHeader),
            0x96|0x97 => Some(Self::ExpectedLength),
            0x98|0x99 => Some(Self::ProcessingStatus),
            _ => None,
        }
    }
}

/// Whether a data object with this tag takes part in the cryptographic checksum.
pub const fn is_authenticated(tag: u8) -> bool {
    tag & 0x01 != 0
}


/// The padding-content indicator for ISO/IEC 7816-4 padding.
pub const PADDING_INDICATOR_ISO7816: u8 = 0x01;

/// The padding-content indicator for "no further indication" (no padding).
pub const PADDING_INDICATOR_NONE: u8 = 0x02;
