//! The encryption stage.
//!
//! Command data is encrypted with AES-CBC under an IV derived from the Send Sequence Counter; the
//! response cryptogram is decrypted the same way.


use zeroize::Zeroizing;

use crate::crypt::cipher_mac::CipherAndMac;
use crate::crypt::padding::{pad, unpad};
use crate::iso7816::apdu::CommandHeader;
use crate::secure_messaging::{DataObject, Error, SmStage};
use crate::secure_messaging::ssc::{SendSequenceCounter, SSC_LENGTH};
use crate::secure_messaging::tags::{PADDING_INDICATOR_ISO7816, PADDING_INDICATOR_NONE, SmTag};


pub struct EncryptionStage {
    cipher: Box<dyn CipherAndMac>,
    key: Zeroizing<Vec<u8>>,
    ssc: SendSequenceCounter,
}
impl EncryptionStage {
    pub fn new(cipher: Box<dyn CipherAndMac>, key: &[u8]) -> Self {
        Self {
            cipher,
            key: Zeroizing::new(key.to_vec()),
            ssc: SendSequenceCounter::default(),
        }
    }

    pub fn ssc(&self) -> &SendSequenceCounter { &self.ssc }

    fn iv(&self, ssc: &[u8; SSC_LENGTH]) -> Result<[u8; SSC_LENGTH], Error> {
        let mut iv = *ssc;
        self.cipher.encrypt_block(&mut iv, &self.key)?;
        Ok(iv)
    }

    fn encrypt(&self, ssc: &[u8; SSC_LENGTH], plain: &[u8]) -> Result<Vec<u8>, Error> {
        let iv = self.iv(ssc)?;
        let mut padded = Zeroizing::new(pad(plain, self.cipher.cipher_block_size()));
        self.cipher.encrypt_data(&mut padded, &self.key, &iv)?;

        let mut value = Vec::with_capacity(1 + padded.len());
        value.push(PADDING_INDICATOR_ISO7816);
        value.extend_from_slice(&padded);
        Ok(value)
    }

    fn decrypt(&self, ssc: &[u8; SSC_LENGTH], cryptogram: &[u8], padded: bool) -> Result<Vec<u8>, Error> {
        let iv = self.iv(ssc)?;
        let mut plain = Zeroizing::new(cryptogram.to_vec());
        self.cipher.decrypt_data(&mut plain, &self.key, &iv)?;
        if padded {
            Ok(unpad(&plain, self.cipher.cipher_block_size())?.to_vec())
        } else {
            Ok(plain.to_vec())
        }
    }
}
impl SmStage for EncryptionStage {
    fn process_command(&mut self, _header: &CommandHeader, objects: Vec<DataObject>) -> Result<Vec<DataObject>, Error> {
        let ssc = self.ssc.advance_for_command()?;
        objects.into_iter()
            .map(|object| {
                if object.sm_tag() != Some(SmTag::PlainValue) {
                    return Ok(object);
                }
                let value = self.encrypt(&ssc, &object.value)?;
                Ok(DataObject::of(SmTag::PaddingIndicatorCryptogram, object.is_authenticated(), value))
            })
            .collect()
    }

    fn process_response(&mut self, objects: Vec<DataObject>) -> Result<Vec<DataObject>, Error> {
        let ssc = self.ssc.for_response();
        objects.into_iter()
            .map(|object| {
                let authenticated = object.is_authenticated();
                let plain = match object.sm_tag() {
                    Some(SmTag::PaddingIndicatorCryptogram) => {
                        let (&indicator, cryptogram) = object.value.split_first()
                            .ok_or(Error::MissingPaddingIndicator)?;
                        match indicator {
                            PADDING_INDICATOR_ISO7816 => self.decrypt(&ssc, cryptogram, true)?,
                            PADDING_INDICATOR_NONE => self.decrypt(&ssc, cryptogram, false)?,
                            other => return Err(Error::UnknownPadding { indicator: other }),
                        }
                    },
                    Some(SmTag::Cryptogram) => self.decrypt(&ssc, &object.value, false)?,
                    _ => return Ok(object),
                };
                Ok(DataObject::of(SmTag::PlainValue, authenticated, plain))
            })
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::cipher_mac::CamAes128;
    use hex_literal::hex;

    const KEY_ENC: [u8; 16] = hex!("F5F0E35C 0D7161EE 6724EE51 3A0D9A7F");

    fn stage() -> EncryptionStage {
        EncryptionStage::new(Box::new(CamAes128), &KEY_ENC)
    }

    #[test]
    fn select_data_is_encrypted() {
        let mut stage = stage();
        let header = CommandHeader::new(0x0C, 0xA4, 0x02, 0x0C);
        let objects = vec![DataObject::new(0x81, hex!("011C").to_vec())];
        let encrypted = stage.process_command(&header, objects).unwrap();
        assert_eq!(
            encrypted,
            vec![DataObject::new(0x87, hex!("01 0BBA9E26C278696F47774F010F3D75BE").to_vec())],
        );
        assert_eq!(stage.ssc().value(), 2);
    }

    #[test]
    fn other_objects_pass_through() {
        let mut stage = stage();
        let header = CommandHeader::new(0x0C, 0xB0, 0x00, 0x00);
        let objects = vec![DataObject::new(0x97, hex!("04").to_vec())];
        assert_eq!(stage.process_command(&header, objects.clone()).unwrap(), objects);
    }

    #[test]
    fn read_binary_response_is_decrypted() {
        let mut stage = stage();
        let header = CommandHeader::new(0x0C, 0xA4, 0x02, 0x0C);
        stage.process_command(&header, Vec::new()).unwrap();
        stage.process_command(&header, Vec::new()).unwrap();

        let objects = vec![
            DataObject::new(0x87, hex!("01 AD2D34A61B89244D3595BF0FE41C935E").to_vec()),
            DataObject::new(0x99, hex!("9000").to_vec()),
        ];
        assert_eq!(
            stage.process_response(objects).unwrap(),
            vec![
                DataObject::new(0x81, hex!("31143012").to_vec()),
                DataObject::new(0x99, hex!("9000").to_vec()),
            ],
        );
    }

    #[test]
    fn unknown_padding_indicator() {
        let objects = vec![DataObject::new(0x87, hex!("03 AD2D34A61B89244D3595BF0FE41C935E").to_vec())];
        assert!(matches!(stage().process_response(objects), Err(Error::UnknownPadding { indicator: 0x03 })));

        let objects = vec![DataObject::new(0x87, Vec::new())];
        assert!(matches!(stage().process_response(objects), Err(Error::MissingPaddingIndicator)));
    }
}
