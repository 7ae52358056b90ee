use std::fmt;

#[cfg(feature = "pcsc")]
use tracing::trace;

use crate::iso7816::apdu;
use crate::secure_messaging;


/// The broad category of a transport failure.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TransportFailure {
    NoCard,
    Timeout,
    Cancelled,
    Other,
}


#[derive(Debug)]
pub enum CommunicationError {
    Write(apdu::WriteError),
    #[cfg(feature = "pcsc")]
    Pcsc(pcsc::Error),
    ShortResponse,
    NoCard,
    Timeout,
    Cancelled,
    SecureMessaging(secure_messaging::Error),
}
impl CommunicationError {
    pub fn failure_kind(&self) -> TransportFailure {
        match self {
            Self::Write(_) => TransportFailure::Other,
            #[cfg(feature = "pcsc")]
            Self::Pcsc(e) => match e {
                pcsc::Error::NoSmartcard|pcsc::Error::RemovedCard|pcsc::Error::ResetCard
                    => TransportFailure::NoCard,
                pcsc::Error::Timeout => TransportFailure::Timeout,
                pcsc::Error::Cancelled => TransportFailure::Cancelled,
                _ => TransportFailure::Other,
            },
            Self::ShortResponse => TransportFailure::Other,
            Self::NoCard => TransportFailure::NoCard,
            Self::Timeout => TransportFailure::Timeout,
            Self::Cancelled => TransportFailure::Cancelled,
            Self::SecureMessaging(_) => TransportFailure::Other,
        }
    }
}
impl fmt::Display for CommunicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write(e) => write!(f, "APDU write error: {}", e),
            #[cfg(feature = "pcsc")]
            Self::Pcsc(e) => write!(f, "PCSC error: {}", e),
            Self::ShortResponse => write!(f, "response too short"),
            Self::NoCard => write!(f, "no card present"),
            Self::Timeout => write!(f, "card communication timed out"),
            Self::Cancelled => write!(f, "card communication cancelled"),
            Self::SecureMessaging(e) => write!(f, "Secure Messaging error: {}", e),
        }
    }
}
impl std::error::Error for CommunicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Write(e) => Some(e),
            #[cfg(feature = "pcsc")]
            Self::Pcsc(e) => Some(e),
            Self::ShortResponse => None,
            Self::NoCard => None,
            Self::Timeout => None,
            Self::Cancelled => None,
            Self::SecureMessaging(e) => Some(e),
        }
    }
}
impl From<apdu::WriteError> for CommunicationError {
    fn from(value: apdu::WriteError) -> Self { Self::Write(value) }
}
#[cfg(feature = "pcsc")]
impl From<pcsc::Error> for CommunicationError {
    fn from(value: pcsc::Error) -> Self { Self::Pcsc(value) }
}
impl From<secure_messaging::Error> for CommunicationError {
    fn from(value: secure_messaging::Error) -> Self { Self::SecureMessaging(value) }
}


/// A smart card compatible with ISO/IEC 7816.
pub trait SmartCard {
    /// Send a request APDU to the smart card and receive a response APDU.
    fn communicate(&mut self, request: &apdu::Apdu) -> Result<apdu::Response, CommunicationError>;
}
impl<SC: SmartCard + ?Sized> SmartCard for &mut SC {
    fn communicate(&mut self, request: &apdu::Apdu) -> Result<apdu::Response, CommunicationError> {
        (**self).communicate(request)
    }
}
impl<SC: SmartCard + ?Sized> SmartCard for Box<SC> {
    fn communicate(&mut self, request: &apdu::Apdu) -> Result<apdu::Response, CommunicationError> {
        (**self).communicate(request)
    }
}
#[cfg(feature = "pcsc")]
impl SmartCard for pcsc::Card {
    fn communicate(&mut self, request: &apdu::Apdu) -> Result<apdu::Response, CommunicationError> {
        let out_buf = request.to_bytes()?;
        trace!("sending to card:\n{}", crate::hexdump(&out_buf));
        let mut in_buf = vec![0u8; request.data.response_data_length().unwrap_or(0) + 2];
        let in_slice = self.transmit(&out_buf, &mut in_buf)?;
        trace!("received from card:\n{}", crate::hexdump(in_slice));
        apdu::Response::from_slice(in_slice)
            .ok_or(CommunicationError::ShortResponse)
    }
}
