//! ISO/IEC 7816-4 Secure Messaging with AES session keys.
//!
//! A plain command APDU is turned into a list of data objects which is passed through a pipeline of
//! stages (encryption first, then the cryptographic checksum). Responses pass through the same
//! stages in reverse order.


pub mod cmac;
pub mod encryption;
pub mod ssc;
pub mod tags;


use std::fmt;

use tracing::{debug, trace};

use crate::crypt;
use crate::crypt::cipher_mac::cipher_and_mac_for_key_size;
use crate::der_util;
use crate::iso7816::apdu::{Apdu, CommandHeader, Data, Response, ResponseTrailer};
use crate::iso7816::card::{CommunicationError, SmartCard};
use crate::iso7816::class_byte::{ClassByte, SmIndication};
use crate::iso7816::status::StatusWord;
use crate::secure_messaging::cmac::CmacStage;
use crate::secure_messaging::encryption::EncryptionStage;
use crate::secure_messaging::tags::SmTag;


#[derive(Debug)]
pub enum Error {
    /// The command already carries a Secure Messaging indication.
    AlreadyProtected,
    /// The class byte is proprietary, reserved, or cannot carry the configured indication.
    UnsupportedClass(u8),
    /// The configured indication is not one of the two interindustry Secure Messaging modes.
    UnsupportedIndication(SmIndication),
    /// The Send Sequence Counter cannot be incremented any further.
    CounterOverflow,
    Crypto(crypt::Error),
    /// The protected command is too long to be transmitted.
    CommandTooLong { length: usize },
    /// The card rejected the Secure Messaging envelope.
    SmRejected(StatusWord),
    /// The envelope was not delivered with normal processing.
    ResponseStatus(StatusWord),
    ResponseTlvFormat,
    CryptographicChecksumMissing,
    CryptographicChecksumWrong,
    MissingStatus,
    /// The processing status is not covered by the cryptographic checksum.
    UnauthenticatedStatus,
    InvalidSwData { length: usize },
    UnknownPadding { indicator: u8 },
    MissingPaddingIndicator,
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyProtected
                => write!(f, "command is already protected by Secure Messaging"),
            Self::UnsupportedClass(cla)
                => write!(f, "class byte 0x{:02X} does not support Secure Messaging", cla),
            Self::UnsupportedIndication(indication)
                => write!(f, "{:?} is not a valid Secure Messaging indication", indication),
            Self::CounterOverflow
                => write!(f, "Send Sequence Counter overflow"),
            Self::Crypto(e)
                => write!(f, "cryptographic error: {}", e),
            Self::CommandTooLong { length }
                => write!(f, "protected command data of {} bytes is too long", length),
            Self::SmRejected(status)
                => write!(f, "card rejected Secure Messaging: {}", status),
            Self::ResponseStatus(status)
                => write!(f, "Secure Messaging response has status {}", status),
            Self::ResponseTlvFormat
                => write!(f, "response has an invalid TLV format"),
            Self::CryptographicChecksumMissing
                => write!(f, "response does not contain a cryptographic checksum"),
            Self::CryptographicChecksumWrong
                => write!(f, "response cryptographic checksum incorrect"),
            Self::MissingStatus
                => write!(f, "response does not contain a processing status"),
            Self::UnauthenticatedStatus
                => write!(f, "response processing status is not authenticated"),
            Self::InvalidSwData { length }
                => write!(f, "processing status has length {}, expected 2", length),
            Self::UnknownPadding { indicator }
                => write!(f, "response payload has unknown padding indicator 0x{:02X}", indicator),
            Self::MissingPaddingIndicator
                => write!(f, "encrypted data object lacks its padding indicator"),
        }
    }
}
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Crypto(e) => Some(e),
            _ => None,
        }
    }
}
impl From<crypt::Error> for Error {
    fn from(value: crypt::Error) -> Self { Self::Crypto(value) }
}


/// Configuration of the Secure Messaging engine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SmConfig {
    /// The indication written into the class byte of each protected command.
    pub indication: SmIndication,

    /// Whether command data is included in the cryptographic checksum.
    pub protect_data: bool,

    /// Whether the expected length is included in the cryptographic checksum.
    pub protect_le: bool,

    /// Whether the command header is sent as an authenticated data object.
    ///
    /// Only meaningful with [`SmIndication::WithoutHeader`]. With [`SmIndication::WithHeader`] the
    /// class byte already announces an authenticated header, so it always enters the checksum.
    pub protect_header: bool,
}
impl Default for SmConfig {
    fn default() -> Self {
        Self {
            indication: SmIndication::WithHeader,
            protect_data: true,
            protect_le: true,
            protect_header: true,
        }
    }
}


/// A Secure Messaging data object.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DataObject {
    pub tag: u8,
    pub value: Vec<u8>,
}
impl DataObject {
    pub fn new(tag: u8, value: Vec<u8>) -> Self {
        Self { tag, value }
    }

    pub fn of(sm_tag: SmTag, authenticated: bool, value: Vec<u8>) -> Self {
        Self::new(sm_tag.tag(authenticated), value)
    }

    pub fn sm_tag(&self) -> Option<SmTag> {
        SmTag::from_tag(self.tag)
    }

    pub fn is_authenticated(&self) -> bool {
        tags::is_authenticated(self.tag)
    }

    pub fn write_to(&self, output: &mut Vec<u8>) {
        der_util::encode_tlv(output, self.tag.into(), &self.value);
    }
}


/// Encodes a list of data objects one after the other.
pub fn encode_data_objects(objects: &[DataObject]) -> Vec<u8> {
    let mut ret = Vec::new();
    for object in objects {
        object.write_to(&mut ret);
    }
    ret
}

/// Decodes the data field of a protected response.
pub fn decode_data_objects(data: &[u8]) -> Result<Vec<DataObject>, Error> {
    let tlvs = der_util::parse_tlvs(data)
        .ok_or(Error::ResponseTlvFormat)?;
    tlvs.into_iter()
        .map(|tlv| {
            let tag = u8::try_from(tlv.tag)
                .map_err(|_| Error::ResponseTlvFormat)?;
            Ok(DataObject::new(tag, tlv.data.to_vec()))
        })
        .collect()
}


/// A step in the Secure Messaging pipeline.
///
/// Each stage owns its own Send Sequence Counter.
pub trait SmStage: Send {
    /// Transforms the data objects of an outgoing command.
    fn process_command(&mut self, header: &CommandHeader, objects: Vec<DataObject>) -> Result<Vec<DataObject>, Error>;

    /// Transforms the data objects of an incoming response.
    fn process_response(&mut self, objects: Vec<DataObject>) -> Result<Vec<DataObject>, Error>;
}


/// The Secure Messaging engine.
pub struct SecureMessaging {
    config: SmConfig,
    stages: Vec<Box<dyn SmStage>>,
}
impl SecureMessaging {
    /// Creates an engine from a configuration and an ordered list of command stages.
    ///
    /// Responses are processed by the same stages in reverse order.
    pub fn new(config: SmConfig, stages: Vec<Box<dyn SmStage>>) -> Result<Self, Error> {
        match config.indication {
            SmIndication::WithHeader|SmIndication::WithoutHeader => {},
            other => return Err(Error::UnsupportedIndication(other)),
        }
        Ok(Self { config, stages })
    }

    /// Creates an engine with the default configuration from PACE session keys.
    pub fn from_session_keys(enc_key: &[u8], mac_key: &[u8]) -> Result<Self, Error> {
        Self::from_session_keys_with_config(SmConfig::default(), enc_key, mac_key)
    }

    /// Creates an engine with an encryption stage followed by a checksum stage.
    pub fn from_session_keys_with_config(config: SmConfig, enc_key: &[u8], mac_key: &[u8]) -> Result<Self, Error> {
        let enc_cipher = cipher_and_mac_for_key_size(enc_key.len())
            .ok_or(crypt::Error::KeyLength { obtained: enc_key.len() })?;
        let mac_cipher = cipher_and_mac_for_key_size(mac_key.len())
            .ok_or(crypt::Error::KeyLength { obtained: mac_key.len() })?;

        let include_header = config.indication == SmIndication::WithHeader;
        let stages: Vec<Box<dyn SmStage>> = vec![
            Box::new(EncryptionStage::new(enc_cipher, enc_key)),
            Box::new(CmacStage::new(mac_cipher, mac_key, include_header)),
        ];
        Self::new(config, stages)
    }

    pub fn config(&self) -> &SmConfig { &self.config }

    /// Protects a plain command APDU.
    pub fn process_request(&mut self, request: &Apdu) -> Result<Apdu, Error> {
        let cla = request.header.cla;
        let class = match ClassByte::parse(cla) {
            None|Some(ClassByte::Proprietary(_)) => return Err(Error::UnsupportedClass(cla)),
            Some(class) => class,
        };
        if class.secure_messaging() != SmIndication::None {
            return Err(Error::AlreadyProtected);
        }
        let protected_cla = class.with_secure_messaging(self.config.indication)
            .and_then(|c| c.to_byte())
            .ok_or(Error::UnsupportedClass(cla))?;
        let header = CommandHeader { cla: protected_cla, ..request.header };

        let mut objects = Vec::with_capacity(4);
        if self.config.protect_header && self.config.indication == SmIndication::WithoutHeader {
            objects.push(DataObject::of(SmTag::CommandHeader, true, header.to_bytes().to_vec()));
        }
        if let Some(request_data) = request.data.request_data() {
            objects.push(DataObject::of(SmTag::PlainValue, self.config.protect_data, request_data.to_vec()));
        }
        if let Some(le) = request.data.response_length_bytes() {
            objects.push(DataObject::of(SmTag::ExpectedLength, self.config.protect_le, le));
        }

        for stage in self.stages.iter_mut() {
            objects = stage.process_command(&header, objects)?;
        }

        let body = encode_data_objects(&objects);
        let expects_response = request.data.response_data_length().is_some();
        let data = if body.is_empty() {
            Data::ResponseDataShort { response_data_length: 0 }
        } else if body.len() <= 255 && !expects_response {
            Data::BothDataShort { request_data: body, response_data_length: 0 }
        } else if body.len() <= 65535 {
            Data::BothDataExtended { request_data: body, response_data_length: 0 }
        } else {
            return Err(Error::CommandTooLong { length: body.len() });
        };

        trace!("protected command INS=0x{:02X} with {} data objects", header.ins, objects.len());
        Ok(Apdu { header, data })
    }

    /// Verifies and unwraps a protected response APDU.
    pub fn process_response(&mut self, response: &Response) -> Result<Response, Error> {
        let outer_status = response.status();
        if outer_status.is_secure_messaging_rejection() {
            return Err(Error::SmRejected(outer_status));
        }
        if outer_status != StatusWord::Success {
            return Err(Error::ResponseStatus(outer_status));
        }

        let mut objects = decode_data_objects(&response.data)?;
        for stage in self.stages.iter_mut().rev() {
            objects = stage.process_response(objects)?;
        }

        let mut data = Vec::new();
        let mut status = None;
        for object in objects {
            match object.sm_tag() {
                Some(SmTag::PlainValue) => data = object.value,
                Some(SmTag::ProcessingStatus) => {
                    let [sw1, sw2] = object.value[..] else {
                        return Err(Error::InvalidSwData { length: object.value.len() });
                    };
                    status = Some(ResponseTrailer::new(sw1, sw2));
                },
                _ => {},
            }
        }
        let trailer = status.ok_or(Error::MissingStatus)?;

        debug!("Secure Messaging response status {}", trailer.status());
        Ok(Response { data, trailer })
    }
}


/// A smart card whose traffic is transparently protected by Secure Messaging.
///
/// The session keys live inside the engine's stages and are zeroized when this value is dropped.
pub struct SecureMessagingCard<SC: SmartCard> {
    card: SC,
    engine: SecureMessaging,
}
impl<SC: SmartCard> SecureMessagingCard<SC> {
    pub fn new(card: SC, engine: SecureMessaging) -> Self {
        Self { card, engine }
    }

    pub fn engine(&self) -> &SecureMessaging { &self.engine }
    pub fn card_mut(&mut self) -> &mut SC { &mut self.card }

    /// Tears down the secure channel, returning the underlying card.
    pub fn into_inner(self) -> SC {
        self.card
    }
}
impl<SC: SmartCard> SmartCard for SecureMessagingCard<SC> {
    fn communicate(&mut self, request: &Apdu) -> Result<Response, CommunicationError> {
        let protected_request = self.engine.process_request(request)?;
        let protected_response = self.card.communicate(&protected_request)?;
        let response = self.engine.process_response(&protected_response)?;
        Ok(response)
    }
}
