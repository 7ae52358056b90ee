//! Key derivation for PACE.
//!
//! `KDF(K, c) = H(K || c)` with `c` a 32-bit big-endian counter; the hash function and the output
//! length depend on the symmetric algorithm of the protocol (BSI TR-03110 Part 3 § A.2.3). The
//! derivation itself is provided by [`CipherAndMac`].


use digest::Digest;
use rasn::types::Oid;
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::crypt::cipher_mac::{CamAes128, CamAes192, CamAes256, CipherAndMac};
use crate::pace::{Error, PacePinId};
use crate::pace::oids::{self, SymmetricAlgorithm};


/// Counter for deriving the Secure Messaging encryption key.
pub const KDF_COUNTER_ENC: u32 = 1;

/// Counter for deriving the Secure Messaging MAC key.
pub const KDF_COUNTER_MAC: u32 = 2;

/// Counter for deriving the key that encrypts the nonce from the password (PI).
pub const KDF_COUNTER_PASSWORD: u32 = 3;


/// The output length of the key derivation function, in bits.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum KdfLength {
    Bits128,
    Bits192,
    Bits256,
}
impl KdfLength {
    /// Derives the output length from an AES-based PACE protocol identifier.
    pub fn from_protocol(protocol: &Oid) -> Option<Self> {
        match oids::classify(protocol)?.1 {
            SymmetricAlgorithm::TripleDes => None,
            SymmetricAlgorithm::Aes128 => Some(Self::Bits128),
            SymmetricAlgorithm::Aes192 => Some(Self::Bits192),
            SymmetricAlgorithm::Aes256 => Some(Self::Bits256),
        }
    }

    pub const fn key_size_bytes(&self) -> usize {
        match self {
            Self::Bits128 => 16,
            Self::Bits192 => 24,
            Self::Bits256 => 32,
        }
    }

    /// The cipher, MAC and hash combination producing keys of this length.
    pub fn cipher_and_mac(&self) -> Box<dyn CipherAndMac> {
        match self {
            Self::Bits128 => Box::new(CamAes128),
            Self::Bits192 => Box::new(CamAes192),
            Self::Bits256 => Box::new(CamAes256),
        }
    }
}


/// Turns the password into the shared secret `π` from which the password key is derived.
///
/// For the MRZ, `password` is the concatenation of document number, date of birth and date of
/// expiry (each with its check digit) and the secret is its SHA-1 hash. All other passwords are
/// encoded in ISO/IEC 8859-1.
pub fn password_secret(pin_id: PacePinId, password: &str) -> Result<Zeroizing<Vec<u8>>, Error> {
    let encoded = encode_latin1(password)?;
    if pin_id == PacePinId::Mrz {
        let mut hasher = Sha1::new();
        hasher.update(encoded.as_slice());
        Ok(Zeroizing::new(hasher.finalize().to_vec()))
    } else {
        Ok(encoded)
    }
}


fn encode_latin1(password: &str) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut ret = Zeroizing::new(Vec::with_capacity(password.len()));
    for c in password.chars() {
        let byte = u8::try_from(u32::from(c))
            .map_err(|_| Error::PasswordEncoding)?;
        ret.push(byte);
    }
    Ok(ret)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::pace::oids::{ID_PACE_ECDH_GM_AES_CBC_CMAC_192, ID_PACE_ECDH_GM_3DES_CBC_CBC};
    use hex_literal::hex;

    #[test]
    fn mrz_secret() {
        let secret = password_secret(PacePinId::Mrz, "T22000129364081251010318").unwrap();
        assert_eq!(secret.as_slice(), &hex!("7E2D2A41 C74EA0B3 8CD36F86 3939BFA8 E9032AAD"));
    }

    #[test]
    fn latin1_secret() {
        assert_eq!(password_secret(PacePinId::Can, "123456").unwrap().as_slice(), b"123456");
        assert_eq!(password_secret(PacePinId::Pin, "Müller").unwrap().as_slice(), &hex!("4D FC 6C 6C 65 72"));
        assert!(matches!(password_secret(PacePinId::Pin, "€"), Err(Error::PasswordEncoding)));
    }

    #[test]
    fn lengths_from_protocol() {
        let length = KdfLength::from_protocol(ID_PACE_ECDH_GM_AES_CBC_CMAC_192).unwrap();
        assert_eq!(length, KdfLength::Bits192);
        assert_eq!(length.cipher_and_mac().cipher_key_size(), 24);
        assert_eq!(KdfLength::from_protocol(ID_PACE_ECDH_GM_3DES_CBC_CBC), None);
    }
}
