//! Structures related to application protocol data units (APDUs).


use std::fmt;
use std::io::{self, Write};

use crate::iso7816::status::StatusWord;


#[derive(Debug)]
pub enum WriteError {
    Io(io::Error),
    EmptyData,
    DataTooLong { maximum: usize, obtained: usize },
}
impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::EmptyData => write!(f, "data is, but must not be, empty"),
            Self::DataTooLong { maximum, obtained } => write!(f, "too much data: obtained {} bytes, expected maximum {} bytes", obtained, maximum),
        }
    }
}
impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::EmptyData => None,
            Self::DataTooLong { .. } => None,
        }
    }
}
impl From<io::Error> for WriteError {
    fn from(value: io::Error) -> Self { Self::Io(value) }
}


#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CommandHeader {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
}
impl CommandHeader {
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self { cla, ins, p1, p2 }
    }

    pub const fn to_bytes(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<(), WriteError> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }
}
impl fmt::Debug for CommandHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommandHeader {} cla: 0x{:02X}, ins: 0x{:02X}, p1: 0x{:02X}, p2: 0x{:02X} {}",
            '{', self.cla, self.ins, self.p1, self.p2, '}',
        )
    }
}

#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResponseTrailer {
    pub sw1: u8,
    pub sw2: u8,
}
impl ResponseTrailer {
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self {
            sw1,
            sw2,
        }
    }

    pub const fn from_word(word: u16) -> Self {
        let bytes = word.to_be_bytes();
        Self::new(bytes[0], bytes[1])
    }

    pub const fn to_bytes(&self) -> [u8; 2] {
        [self.sw1, self.sw2]
    }

    pub const fn to_word(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    pub const fn status(&self) -> StatusWord {
        StatusWord::from_bytes(self.sw1, self.sw2)
    }
}
impl fmt::Debug for ResponseTrailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResponseTrailer {} sw1: 0x{:02X}, sw2: 0x{:02X} {}", '{', self.sw1, self.sw2, '}')
    }
}


/// The body of a command APDU.
///
/// The variants correspond to the cases of ISO/IEC 7816-3:2006 § 12.1.3. A response data length of
/// 0 means the maximum (256 for short, 65536 for extended length).
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Data {
    NoData,
    RequestDataShort {
        request_data: Vec<u8>,
    },
    RequestDataExtended {
        request_data: Vec<u8>,
    },
    ResponseDataShort {
        response_data_length: u8,
    },
    ResponseDataExtended {
        response_data_length: u16,
    },
    BothDataShort {
        request_data: Vec<u8>,
        response_data_length: u8,
    },
    BothDataExtended {
        request_data: Vec<u8>,
        response_data_length: u16,
    },
}
impl Data {
    /// The number of bytes expected in the response, if any are expected at all.
    pub fn response_data_length(&self) -> Option<usize> {
        match self {
            Self::NoData => None,
            Self::RequestDataShort { .. } => None,
            Self::RequestDataExtended { .. } => None,
            Self::ResponseDataShort { response_data_length }|Self::BothDataShort { response_data_length, .. } => {
                if *response_data_length == 0 {
                    Some(256)
                } else {
                    Some((*response_data_length).into())
                }
            },
            Self::ResponseDataExtended { response_data_length }|Self::BothDataExtended { response_data_length, .. } => {
                if *response_data_length == 0 {
                    Some(65536)
                } else {
                    Some((*response_data_length).into())
                }
            },
        }
    }

    /// The Le field exactly as it is encoded on the wire (one byte for short, two for extended).
    pub fn response_length_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::NoData => None,
            Self::RequestDataShort { .. } => None,
            Self::RequestDataExtended { .. } => None,
            Self::ResponseDataShort { response_data_length }|Self::BothDataShort { response_data_length, .. }
                => Some(vec![*response_data_length]),
            Self::ResponseDataExtended { response_data_length }|Self::BothDataExtended { response_data_length, .. }
                => Some(response_data_length.to_be_bytes().to_vec()),
        }
    }

    pub fn request_data(&self) -> Option<&[u8]> {
        match self {
            Self::NoData => None,
            Self::RequestDataShort { request_data } => Some(request_data.as_slice()),
            Self::RequestDataExtended { request_data } => Some(request_data.as_slice()),
            Self::ResponseDataShort { .. } => None,
            Self::ResponseDataExtended { .. } => None,
            Self::BothDataShort { request_data, .. } => Some(request_data.as_slice()),
            Self::BothDataExtended { request_data, .. } => Some(request_data.as_slice()),
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            Self::RequestDataExtended { .. }|Self::ResponseDataExtended { .. }|Self::BothDataExtended { .. }
        )
    }

    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<(), WriteError> {
        fn ensure_length(request_data: &[u8], max_length: usize) -> Result<(), WriteError> {
            if request_data.is_empty() {
                Err(WriteError::EmptyData)
            } else if request_data.len() > max_length {
                Err(WriteError::DataTooLong { maximum: max_length, obtained: request_data.len() })
            } else {
                Ok(())
            }
        }

        // a length of exactly 256 (short) or 65536 (extended) wraps around to 0
        fn short_length(request_data: &[u8]) -> u8 {
            (request_data.len() & 0xFF) as u8
        }
        fn extended_length(request_data: &[u8]) -> [u8; 2] {
            ((request_data.len() & 0xFFFF) as u16).to_be_bytes()
        }

        match self {
            Data::NoData => {
                // case 1
            },
            Data::RequestDataShort { request_data } => {
                // case 3S: [Lc] [Data]
                ensure_length(request_data, 256)?;
                writer.write_all(&[short_length(request_data)])?;
                writer.write_all(request_data)?;
            },
            Data::RequestDataExtended { request_data } => {
                // case 3E: [0x00] [LcMSB] [LcLSB] [Data]
                ensure_length(request_data, 65536)?;
                writer.write_all(&[0x00])?;
                writer.write_all(&extended_length(request_data))?;
                writer.write_all(request_data)?;
            },
            Data::ResponseDataShort { response_data_length } => {
                // case 2S: [Le]
                writer.write_all(&[*response_data_length])?;
            },
            Data::ResponseDataExtended { response_data_length } => {
                // case 2E: [0x00] [LeMSB] [LeLSB]
                writer.write_all(&[0x00])?;
                writer.write_all(&response_data_length.to_be_bytes())?;
            },
            Data::BothDataShort { request_data, response_data_length } => {
                // case 4S: [Lc] [Data] [Le]
                ensure_length(request_data, 256)?;
                writer.write_all(&[short_length(request_data)])?;
                writer.write_all(request_data)?;
                writer.write_all(&[*response_data_length])?;
            },
            Data::BothDataExtended { request_data, response_data_length } => {
                // case 4E: [0x00] [LcMSB] [LcLSB] [Data] [LeMSB] [LeLSB]
                ensure_length(request_data, 65536)?;
                writer.write_all(&[0x00])?;
                writer.write_all(&extended_length(request_data))?;
                writer.write_all(request_data)?;
                writer.write_all(&response_data_length.to_be_bytes())?;
            },
        }
        Ok(())
    }

    /// Decodes the body of a command APDU (everything after the four header bytes).
    ///
    /// Decoding is lenient towards two common deviations: a short-length command followed by a
    /// three-byte extended Le, and an extended-length command followed by a single-byte Le. Both are
    /// taken as extended-length commands.
    pub fn from_slice(body: &[u8]) -> Option<Self> {
        fn word(bytes: &[u8]) -> u16 {
            u16::from_be_bytes([bytes[0], bytes[1]])
        }

        match body {
            [] => Some(Self::NoData),
            [le] => Some(Self::ResponseDataShort { response_data_length: *le }),
            [0x00, le_hi, le_lo] => Some(Self::ResponseDataExtended {
                response_data_length: u16::from_be_bytes([*le_hi, *le_lo]),
            }),
            [0x00, rest @ ..] => {
                // extended Lc
                if rest.len() < 2 {
                    return None;
                }
                let request_length = usize::from(word(rest));
                let rest = &rest[2..];
                if request_length == 0 || rest.len() < request_length {
                    return None;
                }
                let (request_data, trailer) = rest.split_at(request_length);
                let request_data = request_data.to_vec();
                match trailer {
                    [] => Some(Self::RequestDataExtended { request_data }),
                    [le] => Some(Self::BothDataExtended { request_data, response_data_length: (*le).into() }),
                    [le_hi, le_lo] => Some(Self::BothDataExtended { request_data, response_data_length: word(&[*le_hi, *le_lo]) }),
                    [0x00, le_hi, le_lo] => Some(Self::BothDataExtended { request_data, response_data_length: word(&[*le_hi, *le_lo]) }),
                    _ => None,
                }
            },
            [lc, rest @ ..] => {
                // short Lc
                let request_length = usize::from(*lc);
                if rest.len() < request_length {
                    return None;
                }
                let (request_data, trailer) = rest.split_at(request_length);
                let request_data = request_data.to_vec();
                match trailer {
                    [] => Some(Self::RequestDataShort { request_data }),
                    [le] => Some(Self::BothDataShort { request_data, response_data_length: *le }),
                    [0x00, le_hi, le_lo] => Some(Self::BothDataExtended { request_data, response_data_length: word(&[*le_hi, *le_lo]) }),
                    _ => None,
                }
            },
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Apdu {
    pub header: CommandHeader,
    pub data: Data,
}
impl Apdu {
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<(), WriteError> {
        self.header.write_bytes(writer)?;
        self.data.write_bytes(writer)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let mut buf = Vec::new();
        self.write_bytes(&mut buf)?;
        Ok(buf)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }
        let header = CommandHeader::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let data = Data::from_slice(&bytes[4..])?;
        Some(Self { header, data })
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Response {
    pub data: Vec<u8>,
    pub trailer: ResponseTrailer,
}
impl Response {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 2 {
            return None;
        }

        let (data, trailer) = bytes.split_at(bytes.len() - 2);
        Some(Self {
            data: data.to_vec(),
            trailer: ResponseTrailer::new(trailer[0], trailer[1]),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() + 2);
        bytes.extend(&self.data);
        bytes.extend(self.trailer.to_bytes());
        bytes
    }

    pub fn status(&self) -> StatusWord {
        self.trailer.status()
    }

    pub fn is_success(&self) -> bool {
        self.trailer.to_word() == 0x9000
    }
}
