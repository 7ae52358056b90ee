//! Cipher and MAC (message authentication code) combinations.


use std::fmt;

use aes::{Aes128, Aes192, Aes256};
use cipher::{BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use cipher::block_padding::NoPadding;
use cipher::generic_array::GenericArray;
use cmac::{Cmac, Mac};
use digest::Digest;
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypt::Error;
use crate::pace::kdf::{KDF_COUNTER_ENC, KDF_COUNTER_MAC, KDF_COUNTER_PASSWORD};


/// The number of bytes of the CMAC output that are actually transmitted.
pub const MAC_LENGTH: usize = 8;

/// The block size of AES in bytes.
pub const AES_BLOCK_SIZE: usize = 16;


/// A combination of cipher, MAC and KDF (key derivation function) usable during authentication and
/// Secure Messaging.
pub trait CipherAndMac: fmt::Debug + Send + Sync {
    /// Size of the cipher key in bytes.
    fn cipher_key_size(&self) -> usize;

    /// Block size of the cipher in bytes.
    fn cipher_block_size(&self) -> usize { AES_BLOCK_SIZE }

    /// The key derivation function.
    fn derive_key(&self, key_seed: &[u8], counter: u32) -> Zeroizing<Vec<u8>>;

    /// The key derivation function for encryption purposes.
    fn derive_encryption_key(&self, key_seed: &[u8]) -> Zeroizing<Vec<u8>> {
        self.derive_key(key_seed, KDF_COUNTER_ENC)
    }

    /// The key derivation function for message authentication purposes.
    fn derive_mac_key(&self, key_seed: &[u8]) -> Zeroizing<Vec<u8>> {
        self.derive_key(key_seed, KDF_COUNTER_MAC)
    }

    /// The password-to-key derivation function.
    fn derive_key_from_password(&self, password: &[u8]) -> Zeroizing<Vec<u8>> {
        self.derive_key(password, KDF_COUNTER_PASSWORD)
    }

    /// Encrypts exactly one block in-place (ECB).
    fn encrypt_block(&self, block: &mut [u8], key: &[u8]) -> Result<(), Error>;

    /// Decrypts block-aligned data in-place using the given key and CBC IV.
    ///
    /// Does not strip padding.
    fn decrypt_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error>;

    /// Encrypts pre-padded data in-place using the given key and CBC IV.
    fn encrypt_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error>;

    /// Generates a truncated CMAC for the given data and key.
    ///
    /// CMAC pads internally; callers pass the data exactly as it should be authenticated.
    fn mac(&self, data: &[u8], key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error>;

    /// Verifies in constant time whether the given data fits the given MAC.
    fn verify_mac(&self, data: &[u8], key: &[u8], expected_mac: &[u8]) -> Result<bool, Error> {
        let computed_mac = self.mac(data, key)?;
        Ok(computed_mac.as_slice().ct_eq(expected_mac).into())
    }
}


fn ensure_block_aligned(data: &[u8]) -> Result<(), Error> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        Err(Error::BlockAlignment { block_size: AES_BLOCK_SIZE, length: data.len() })
    } else {
        Ok(())
    }
}


macro_rules! implement_aes_cipher_and_mac {
    ($name:ident, $aes:ty, $key_size:expr, $hash:ty) => {
        #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name;
        impl CipherAndMac for $name {
            fn cipher_key_size(&self) -> usize { $key_size }

            fn derive_key(&self, key_seed: &[u8], counter: u32) -> Zeroizing<Vec<u8>> {
                let mut hasher = <$hash as Digest>::new();
                Digest::update(&mut hasher, key_seed);
                Digest::update(&mut hasher, counter.to_be_bytes());
                let result = hasher.finalize();

                Zeroizing::new(result[0..$key_size].to_vec())
            }

            fn encrypt_block(&self, block: &mut [u8], key: &[u8]) -> Result<(), Error> {
                if block.len() != AES_BLOCK_SIZE {
                    return Err(Error::BlockAlignment { block_size: AES_BLOCK_SIZE, length: block.len() });
                }
                let cipher = <$aes as KeyInit>::new_from_slice(key)
                    .map_err(|_| Error::KeyLength { obtained: key.len() })?;
                cipher.encrypt_block(GenericArray::from_mut_slice(block));
                Ok(())
            }

            fn decrypt_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
                ensure_block_aligned(data)?;
                if iv.len() != AES_BLOCK_SIZE {
                    return Err(Error::IvLength { obtained: iv.len() });
                }
                let decryptor = cbc::Decryptor::<$aes>::new_from_slices(key, iv)
                    .map_err(|_| Error::KeyLength { obtained: key.len() })?;
                decryptor.decrypt_padded_mut::<NoPadding>(data)
                    .map_err(|_| Error::InvalidPadding)?;
                Ok(())
            }

            fn encrypt_data(&self, data: &mut [u8], key: &[u8], iv: &[u8]) -> Result<(), Error> {
                ensure_block_aligned(data)?;
                if iv.len() != AES_BLOCK_SIZE {
                    return Err(Error::IvLength { obtained: iv.len() });
                }
                let encryptor = cbc::Encryptor::<$aes>::new_from_slices(key, iv)
                    .map_err(|_| Error::KeyLength { obtained: key.len() })?;
                let length = data.len();
                encryptor.encrypt_padded_mut::<NoPadding>(data, length)
                    .map_err(|_| Error::BlockAlignment { block_size: AES_BLOCK_SIZE, length })?;
                Ok(())
            }

            fn mac(&self, data: &[u8], key: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
                let mut mac = <Cmac<$aes> as Mac>::new_from_slice(key)
                    .map_err(|_| Error::KeyLength { obtained: key.len() })?;
                Mac::update(&mut mac, data);
                let full_mac = Zeroizing::new(mac.finalize().into_bytes().to_vec());
                Ok(Zeroizing::new(full_mac[..MAC_LENGTH].to_vec()))
            }
        }
    };
}

implement_aes_cipher_and_mac!(CamAes128, Aes128, 16, Sha1);
implement_aes_cipher_and_mac!(CamAes192, Aes192, 24, Sha256);
implement_aes_cipher_and_mac!(CamAes256, Aes256, 32, Sha256);


/// Selects the AES combination whose key size matches the given session key length.
pub fn cipher_and_mac_for_key_size(key_size: usize) -> Option<Box<dyn CipherAndMac>> {
    match key_size {
        16 => Some(Box::new(CamAes128)),
        24 => Some(Box::new(CamAes192)),
        32 => Some(Box::new(CamAes256)),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn kdf_icao_doc9303_part11_secg1() {
        // K = SHA-1(MRZ information), counter 3
        let key_seed = hex!("7E2D2A41 C74EA0B3 8CD36F86 3939BFA8 E9032AAD");
        let pi = CamAes128.derive_key_from_password(&key_seed);
        assert_eq!(pi.as_slice(), &hex!("89DED1B2 6624EC1E 634C1989 302849DD"));
    }

    #[test]
    fn session_keys_icao_doc9303_part11_secg1() {
        let shared_secret = hex!("
            28768D20 701247DA E81804C9 E780EDE5
            82A9996D B4A31502 0B273319 7DB84925
        ");
        assert_eq!(
            CamAes128.derive_encryption_key(&shared_secret).as_slice(),
            &hex!("F5F0E35C 0D7161EE 6724EE51 3A0D9A7F"),
        );
        assert_eq!(
            CamAes128.derive_mac_key(&shared_secret).as_slice(),
            &hex!("FE251C78 58B356B2 4514B3BD 5F4297D1"),
        );
    }

    #[test]
    fn key_sizes() {
        assert_eq!(CamAes192.derive_key(b"seed", 1).len(), 24);
        assert_eq!(CamAes256.derive_key(b"seed", 1).len(), 32);
        assert_eq!(cipher_and_mac_for_key_size(24).unwrap().cipher_key_size(), 24);
        assert!(cipher_and_mac_for_key_size(8).is_none());
    }

    #[test]
    fn cbc_round_trip() {
        let key = hex!("000102030405060708090A0B0C0D0E0F");
        let iv = [0u8; 16];
        let plain = hex!("00112233445566778899AABBCCDDEEFF 00112233445566778899AABBCCDDEEFF");
        let mut data = plain.to_vec();
        CamAes128.encrypt_data(&mut data, &key, &iv).unwrap();
        assert_ne!(data, plain);
        // FIPS-197 C.1; the first block under a zero IV is plain ECB
        assert_eq!(&data[..16], &hex!("69C4E0D86A7B0430D8CDB78070B4C55A"));
        CamAes128.decrypt_data(&mut data, &key, &iv).unwrap();
        assert_eq!(data, plain);

        let mut block = plain[..16].to_vec();
        CamAes128.encrypt_block(&mut block, &key).unwrap();
        assert_eq!(block, hex!("69C4E0D86A7B0430D8CDB78070B4C55A"));
    }

    #[test]
    fn misaligned_data_rejected() {
        let key = [0u8; 16];
        let mut data = vec![0u8; 15];
        assert_eq!(
            CamAes128.encrypt_data(&mut data, &key, &[0u8; 16]),
            Err(Error::BlockAlignment { block_size: 16, length: 15 }),
        );
        assert_eq!(
            CamAes128.encrypt_block(&mut [0u8; 16], &[0u8; 15]),
            Err(Error::KeyLength { obtained: 15 }),
        );
    }

    #[test]
    fn cmac_rfc4493() {
        let key = hex!("2B7E1516 28AED2A6 ABF71588 09CF4F3C");
        let message = hex!("6BC1BEE2 2E409F96 E93D7E11 7393172A");
        let mac = CamAes128.mac(&message, &key).unwrap();
        assert_eq!(mac.as_slice(), &hex!("070A16B4 6B4D4144"));
        assert!(CamAes128.verify_mac(&message, &key, &hex!("070A16B4 6B4D4144")).unwrap());
        assert!(!CamAes128.verify_mac(&message, &key, &hex!("070A16B4 6B4D4145")).unwrap());
    }
}
