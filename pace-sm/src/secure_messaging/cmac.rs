//! The cryptographic checksum stage.


use tracing::trace;
use zeroize::Zeroizing;

use crate::crypt::cipher_mac::{CipherAndMac, MAC_LENGTH};
use crate::crypt::padding::pad;
use crate::iso7816::apdu::CommandHeader;
use crate::secure_messaging::{DataObject, Error, SmStage};
use crate::secure_messaging::ssc::SendSequenceCounter;
use crate::secure_messaging::tags::SmTag;


/// Appends a CMAC over the authenticated data objects of each command and verifies the one
/// attached to each response.
pub struct CmacStage {
    cipher: Box<dyn CipherAndMac>,
    key: Zeroizing<Vec<u8>>,
    ssc: SendSequenceCounter,
    include_header: bool,
    optional: bool,
}
impl CmacStage {
    pub fn new(cipher: Box<dyn CipherAndMac>, key: &[u8], include_header: bool) -> Self {
        Self {
            cipher,
            key: Zeroizing::new(key.to_vec()),
            ssc: SendSequenceCounter::default(),
            include_header,
            optional: false,
        }
    }

    /// Makes a missing checksum on responses acceptable.
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn ssc(&self) -> &SendSequenceCounter { &self.ssc }

    fn mac_input(&self, ssc: &[u8], header: Option<&CommandHeader>, objects: &[DataObject]) -> Zeroizing<Vec<u8>> {
        let block_size = self.cipher.cipher_block_size();
        let mut input = Zeroizing::new(Vec::new());
        input.extend_from_slice(ssc);
        if let Some(header) = header {
            input.extend(pad(&header.to_bytes(), block_size));
        }

        // every maximal run of authenticated objects is padded on its own
        let mut run = Vec::new();
        for object in objects {
            if object.is_authenticated() {
                object.write_to(&mut run);
            } else if !run.is_empty() {
                input.extend(pad(&run, block_size));
                run.clear();
            }
        }
        if !run.is_empty() {
            input.extend(pad(&run, block_size));
        }
        input
    }
}
impl SmStage for CmacStage {
    fn process_command(&mut self, header: &CommandHeader, mut objects: Vec<DataObject>) -> Result<Vec<DataObject>, Error> {
        let ssc = self.ssc.advance_for_command()?;
        let mac_header = if self.include_header { Some(header) } else { None };
        let input = self.mac_input(&ssc, mac_header, &objects);
        let mac = self.cipher.mac(&input, &self.key)?;

        objects.push(DataObject::of(SmTag::CryptographicChecksum, false, mac.to_vec()));
        Ok(objects)
    }

    fn process_response(&mut self, mut objects: Vec<DataObject>) -> Result<Vec<DataObject>, Error> {
        let checksum_tag = SmTag::CryptographicChecksum.tag(false);
        let Some(mac_index) = objects.iter().position(|o| o.tag == checksum_tag) else {
            if self.optional {
                trace!("response carries no cryptographic checksum");
                return Ok(objects);
            }
            return Err(Error::CryptographicChecksumMissing);
        };
        if !self.optional && objects.iter().any(|o| o.tag == SmTag::ProcessingStatus.tag(false)) {
            return Err(Error::UnauthenticatedStatus);
        }
        let received_mac = objects.remove(mac_index);
        if received_mac.value.len() != MAC_LENGTH {
            return Err(Error::CryptographicChecksumWrong);
        }

        let ssc = self.ssc.for_response();
        let input = self.mac_input(&ssc, None, &objects);
        if !self.cipher.verify_mac(&input, &self.key, &received_mac.value)? {
            return Err(Error::CryptographicChecksumWrong);
        }
        Ok(objects)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::cipher_mac::CamAes128;
    use hex_literal::hex;

    const KEY_MAC: [u8; 16] = hex!("FE251C78 58B356B2 4514B3BD 5F4297D1");

    fn stage() -> CmacStage {
        CmacStage::new(Box::new(CamAes128), &KEY_MAC, true)
    }

    #[test]
    fn runs_are_interrupted_by_plain_objects() {
        let stage = stage();
        let objects = vec![
            DataObject::new(0x87, hex!("0102").to_vec()),
            DataObject::new(0x97, hex!("00").to_vec()),
            DataObject::new(0x80, hex!("AABB").to_vec()),
            DataObject::new(0x99, hex!("9000").to_vec()),
        ];
        let input = stage.mac_input(&[0u8; 16], None, &objects);
        assert_eq!(
            input.as_slice(),
            &hex!("
                00000000000000000000000000000000
                87020102 970100 800000000000000000
                99029000 800000000000000000000000
            "),
        );
    }

    #[test]
    fn header_is_padded_separately() {
        let stage = stage();
        let header = CommandHeader::new(0x0C, 0x84, 0x00, 0x00);
        let input = stage.mac_input(&[0u8; 16], Some(&header), &[]);
        assert_eq!(
            input.as_slice(),
            &hex!("00000000000000000000000000000000 0C840000800000000000000000000000"),
        );
    }

    #[test]
    fn status_response() {
        // a fresh stage checks the response under a zero counter
        let mut stage = stage();
        let objects = vec![
            DataObject::new(0x99, hex!("9000").to_vec()),
            DataObject::new(0x8E, hex!("BEA7B381C494A079").to_vec()),
        ];
        assert!(matches!(stage.process_response(objects.clone()), Err(Error::CryptographicChecksumWrong)));

        stage.process_command(&CommandHeader::new(0x0C, 0xA4, 0x02, 0x0C), Vec::new()).unwrap();
        let remaining = stage.process_response(objects).unwrap();
        assert_eq!(remaining, vec![DataObject::new(0x99, hex!("9000").to_vec())]);
    }

    #[test]
    fn status_must_be_authenticated() {
        let objects = vec![
            DataObject::new(0x98, hex!("9000").to_vec()),
            DataObject::new(0x8E, hex!("BEA7B381C494A079").to_vec()),
        ];
        assert!(matches!(stage().process_response(objects), Err(Error::UnauthenticatedStatus)));
    }

    #[test]
    fn missing_checksum() {
        let objects = vec![DataObject::new(0x99, hex!("9000").to_vec())];
        assert!(matches!(stage().process_response(objects.clone()), Err(Error::CryptographicChecksumMissing)));
        assert_eq!(stage().optional(true).process_response(objects.clone()).unwrap(), objects);
    }
}
