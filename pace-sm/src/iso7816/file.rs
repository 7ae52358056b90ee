//! Reading transparent elementary files.


use std::fmt;

use tracing::debug;

use crate::iso7816::apdu;
use crate::iso7816::card::{CommunicationError, SmartCard};
use crate::iso7816::status::StatusWord;


/// The largest offset that can be expressed in P1-P2 of READ BINARY.
const MAX_OFFSET: usize = 0x7FFF;


#[derive(Debug)]
pub enum ReadError {
    InvalidShortFileIdentifier(u8),
    ReadCommunication(CommunicationError),
    FileNotFound,
    ReadFailed(apdu::Response),
    FileTooLong,
}
impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::InvalidShortFileIdentifier(sfi)
                => write!(f, "0x{:02X} is not a valid short file identifier", sfi),
            Self::ReadCommunication(e)
                => write!(f, "READ BINARY communication failed: {}", e),
            Self::FileNotFound
                => write!(f, "file not found"),
            Self::ReadFailed(response)
                => write!(f, "READ BINARY operation failed with status {}", response.status()),
            Self::FileTooLong
                => write!(f, "file exceeds the range addressable by READ BINARY"),
        }
    }
}
impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidShortFileIdentifier(_) => None,
            Self::ReadCommunication(e) => Some(e),
            Self::FileNotFound => None,
            Self::ReadFailed(_response) => None,
            Self::FileTooLong => None,
        }
    }
}
impl From<CommunicationError> for ReadError {
    fn from(value: CommunicationError) -> Self { Self::ReadCommunication(value) }
}


fn read_binary_apdu(p1: u8, p2: u8, response_data_length: u8) -> apdu::Apdu {
    apdu::Apdu {
        header: apdu::CommandHeader {
            cla: 0x00,
            ins: 0xB0, // READ BINARY, offset or short EF identifier
            p1,
            p2,
        },
        data: apdu::Data::ResponseDataShort {
            response_data_length,
        },
    }
}


/// Reads a complete transparent elementary file selected by its short file identifier.
///
/// The first READ BINARY selects the file implicitly (`P1 = 0x80 | sfi`); subsequent commands read
/// from the current file at increasing offsets until the card returns less than a full chunk or
/// reports the end of the file.
pub fn read_binary_sfi<SC: SmartCard>(card: &mut SC, sfi: u8) -> Result<Vec<u8>, ReadError> {
    if sfi == 0 || sfi > 0x1E {
        return Err(ReadError::InvalidShortFileIdentifier(sfi));
    }

    let mut contents = Vec::new();
    let mut request = read_binary_apdu(0x80 | sfi, 0x00, 0x00);
    loop {
        let requested = request.data.response_data_length().unwrap_or(256);
        let response = card.communicate(&request)?;
        match response.status() {
            StatusWord::Success => {},
            StatusWord::EndOfFileReached => {
                contents.extend(&response.data);
                break;
            },
            StatusWord::WrongLe(exact) => {
                // the card tells us exactly how many bytes remain
                request.data = apdu::Data::ResponseDataShort { response_data_length: exact };
                continue;
            },
            StatusWord::FileNotFound => return Err(ReadError::FileNotFound),
            StatusWord::WrongParametersP1P2|StatusWord::IncorrectP1P2 if !contents.is_empty() => {
                // offset is past the end of the file
                break;
            },
            _ => return Err(ReadError::ReadFailed(response)),
        }

        contents.extend(&response.data);
        if response.data.len() < requested {
            break;
        }

        let offset = contents.len();
        if offset > MAX_OFFSET {
            return Err(ReadError::FileTooLong);
        }
        let offset_bytes = (offset as u16).to_be_bytes();
        request = read_binary_apdu(offset_bytes[0], offset_bytes[1], 0x00);
    }

    debug!("read {} bytes from short file identifier 0x{:02X}", contents.len(), sfi);
    Ok(contents)
}


#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use crate::iso7816::apdu::{Apdu, Response};

    struct ChunkedFileCard {
        contents: Vec<u8>,
        requests: Vec<Vec<u8>>,
    }
    impl SmartCard for ChunkedFileCard {
        fn communicate(&mut self, request: &Apdu) -> Result<Response, CommunicationError> {
            self.requests.push(request.to_bytes()?);
            let offset = if request.header.p1 & 0x80 != 0 {
                assert_eq!(request.header.p1, 0x9C);
                0
            } else {
                usize::from(u16::from_be_bytes([request.header.p1, request.header.p2]))
            };
            if offset > self.contents.len() {
                return Ok(Response::from_slice(&hex!("6B00")).unwrap());
            }
            let wanted = request.data.response_data_length().unwrap();
            let end = (offset + wanted).min(self.contents.len());
            let mut bytes = self.contents[offset..end].to_vec();
            bytes.extend(hex!("9000"));
            Ok(Response::from_slice(&bytes).unwrap())
        }
    }

    #[test]
    fn read_card_access() {
        let contents = hex!("31143012060A04007F0007020204020202010202010D").to_vec();
        let mut card = ChunkedFileCard { contents: contents.clone(), requests: Vec::new() };
        let read = read_binary_sfi(&mut card, 0x1C).unwrap();
        assert_eq!(read, contents);
        assert_eq!(card.requests, vec![hex!("00B09C0000").to_vec()]);
    }

    #[test]
    fn read_multiple_chunks() {
        let contents: Vec<u8> = (0..600u16).map(|i| (i % 251) as u8).collect();
        let mut card = ChunkedFileCard { contents: contents.clone(), requests: Vec::new() };
        let read = read_binary_sfi(&mut card, 0x1C).unwrap();
        assert_eq!(read, contents);
        assert_eq!(
            card.requests,
            vec![
                hex!("00B09C0000").to_vec(),
                hex!("00B0010000").to_vec(),
                hex!("00B0020000").to_vec(),
            ],
        );
    }

    #[test]
    fn invalid_sfi() {
        let mut card = ChunkedFileCard { contents: Vec::new(), requests: Vec::new() };
        assert!(matches!(read_binary_sfi(&mut card, 0x1F), Err(ReadError::InvalidShortFileIdentifier(0x1F))));
        assert!(card.requests.is_empty());
    }
}
