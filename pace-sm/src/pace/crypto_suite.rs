//! The cryptographic side of PACE ECDH Generic Mapping, as a sequence of states.
//!
//! Each state consumes itself when advancing, so the protocol steps can only be taken in order:
//!
//! ```text
//! Start --derive_password_key--> Step1 --decrypt_nonce--> Step2 --map_public_key_icc-->
//! Step3 --decode_public_key_icc--> Step4 --verify_token_icc--> PaceResult
//! ```
//!
//! No card communication happens here; see [`process`](crate::pace::process) for that.


use std::fmt;

use crypto_bigint::BoxedUint;
use rand::{CryptoRng, RngCore};
use rasn::types::{ObjectIdentifier, Oid};
use tracing::trace;
use zeroize::Zeroizing;

use crate::crypt::{boxed_uint_from_be_slice, strip_leading_zeros};
use crate::crypt::cipher_mac::CipherAndMac;
use crate::crypt::elliptic::{AffinePoint, PrimeWeierstrassCurve};
use crate::crypt::elliptic::curves::curve_for_parameter_id;
use crate::der_util;
use crate::hexdump;
use crate::pace::{Error, PacePinId, Step};
use crate::pace::asn1::PaceInfo;
use crate::pace::kdf::{self, KdfLength};


/// Tag of the public key data object in the authentication token input.
const TAG_PUBLIC_KEY: u32 = 0x7F49;

/// Tag of the object identifier inside the public key data object.
const TAG_OID: u32 = 0x06;

/// Tag of the elliptic curve point inside the public key data object.
const TAG_EC_POINT: u32 = 0x86;


/// What every state carries along.
struct Suite {
    protocol: ObjectIdentifier,
    curve: PrimeWeierstrassCurve,
    cipher: Box<dyn CipherAndMac>,
}
impl Suite {
    fn encode_point(&self, curve: &PrimeWeierstrassCurve, point: &AffinePoint, step: Step) -> Result<Zeroizing<Vec<u8>>, Error> {
        curve.encode_point(point)
            .ok_or(Error::InvalidPublicKey { step })
    }

    /// `7F49 { 06 protocol, 86 point }`, the MAC input of an authentication token.
    fn authentication_token_input(&self, encoded_point: &[u8]) -> Vec<u8> {
        let mut inner = Vec::new();
        der_util::encode_tlv(&mut inner, TAG_OID, &der_util::oid_to_der_bytes(&self.protocol));
        der_util::encode_tlv(&mut inner, TAG_EC_POINT, encoded_point);

        let mut ret = Vec::with_capacity(inner.len() + 4);
        der_util::encode_tlv(&mut ret, TAG_PUBLIC_KEY, &inner);
        ret
    }
}
impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("protocol", &self.protocol)
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}


/// The domain parameters and algorithms have been chosen.
#[derive(Debug)]
pub struct Start {
    suite: Suite,
}
impl Start {
    /// Resolves the standardized domain parameters and the key length for the given EF.CardAccess
    /// entry.
    ///
    /// `parameter_id_override` takes precedence over the parameter ID in `pace_info`.
    pub fn new(pace_info: &PaceInfo, parameter_id_override: Option<u32>) -> Result<Self, Error> {
        if !pace_info.is_supported() {
            return Err(Error::MappingNotSupported { protocol: pace_info.protocol.clone() });
        }
        let kdf_length = KdfLength::from_protocol(&pace_info.protocol)
            .ok_or_else(|| Error::MappingNotSupported { protocol: pace_info.protocol.clone() })?;

        let parameter_id = parameter_id_override
            .or(pace_info.parameter_id)
            .ok_or(Error::CustomParameters)?;
        let curve = curve_for_parameter_id(parameter_id)
            .ok_or_else(|| Error::IncompatibleProtocolParameter {
                protocol: pace_info.protocol.clone(),
                parameter: parameter_id,
            })?;

        Ok(Self {
            suite: Suite {
                protocol: pace_info.protocol.clone(),
                curve,
                cipher: kdf_length.cipher_and_mac(),
            },
        })
    }

    pub fn protocol(&self) -> &Oid { &self.suite.protocol }

    /// Derives the key `K_π` which encrypts the nonce.
    pub fn derive_password_key(self, pin_id: PacePinId, password: &str) -> Result<Step1, Error> {
        let secret = kdf::password_secret(pin_id, password)?;
        let password_key = self.suite.cipher.derive_key_from_password(&secret);
        Ok(Step1 {
            suite: self.suite,
            password_key,
        })
    }
}


/// The password key is known; waiting for the encrypted nonce.
pub struct Step1 {
    suite: Suite,
    password_key: Zeroizing<Vec<u8>>,
}
impl Step1 {
    /// Decrypts the nonce and generates the mapping key pair.
    pub fn decrypt_nonce<R: RngCore + CryptoRng>(self, encrypted_nonce: &[u8], rng: &mut R) -> Result<Step2, Error> {
        let mapping_private_key = self.suite.curve.generate_private_key(rng);
        self.decrypt_nonce_with_private_key(encrypted_nonce, mapping_private_key)
    }

    /// Decrypts the nonce and takes the given mapping private key.
    pub fn decrypt_nonce_with_private_key(self, encrypted_nonce: &[u8], mapping_private_key: BoxedUint) -> Result<Step2, Error> {
        let block_size = self.suite.cipher.cipher_block_size();
        if encrypted_nonce.is_empty() {
            return Err(Error::NonceDecryption(crate::crypt::Error::BlockAlignment { block_size, length: 0 }));
        }

        // CBC with a zero IV and without padding
        let iv = vec![0u8; block_size];
        let mut nonce = Zeroizing::new(encrypted_nonce.to_vec());
        self.suite.cipher.decrypt_data(&mut nonce, &self.password_key, &iv)
            .map_err(Error::NonceDecryption)?;

        let mapping_public_key = self.suite.curve.calculate_public_key(&mapping_private_key)
            .ok_or(Error::InvalidPublicKey { step: Step::MapNonce })?;
        let encoded_mapping_public_key = self.suite.encode_point(&self.suite.curve, &mapping_public_key, Step::MapNonce)?;

        Ok(Step2 {
            suite: self.suite,
            nonce: Zeroizing::new(boxed_uint_from_be_slice(&nonce)),
            mapping_private_key: Zeroizing::new(mapping_private_key),
            encoded_mapping_public_key,
        })
    }
}


/// The nonce is known; the mapping public keys are being exchanged.
pub struct Step2 {
    suite: Suite,
    nonce: Zeroizing<BoxedUint>,
    mapping_private_key: Zeroizing<BoxedUint>,
    encoded_mapping_public_key: Zeroizing<Vec<u8>>,
}
impl Step2 {
    /// The terminal's mapping public key in uncompressed encoding.
    pub fn map_public_key_pcd(&self) -> &[u8] {
        &self.encoded_mapping_public_key
    }

    /// Maps the nonce onto a new generator and generates the ephemeral key pair on it.
    pub fn map_public_key_icc<R: RngCore + CryptoRng>(self, map_public_key_icc: &[u8], rng: &mut R) -> Result<Step3, Error> {
        let session_curve = self.session_curve(map_public_key_icc)?;
        let ephemeral_private_key = session_curve.generate_private_key(rng);
        Self::with_session_curve(self.suite, session_curve, ephemeral_private_key)
    }

    /// Maps the nonce onto a new generator and takes the given ephemeral private key.
    pub fn map_public_key_icc_with_private_key(self, map_public_key_icc: &[u8], ephemeral_private_key: BoxedUint) -> Result<Step3, Error> {
        let session_curve = self.session_curve(map_public_key_icc)?;
        Self::with_session_curve(self.suite, session_curve, ephemeral_private_key)
    }

    fn session_curve(&self, map_public_key_icc: &[u8]) -> Result<PrimeWeierstrassCurve, Error> {
        let step = Step::MapNonce;
        if map_public_key_icc == self.encoded_mapping_public_key.as_slice() {
            return Err(Error::KeysEqual { step });
        }
        let icc_point = self.suite.curve.decode_point(map_public_key_icc)
            .ok_or(Error::InvalidPublicKey { step })?;
        let shared_point = self.suite.curve.diffie_hellman(&self.mapping_private_key, &icc_point)
            .ok_or(Error::InvalidPublicKey { step })?;
        self.suite.curve.derive_generic_mapping_session_curve(&self.nonce, &shared_point)
            .ok_or(Error::InvalidPublicKey { step })
    }

    fn with_session_curve(suite: Suite, session_curve: PrimeWeierstrassCurve, ephemeral_private_key: BoxedUint) -> Result<Step3, Error> {
        let ephemeral_public_key = session_curve.calculate_public_key(&ephemeral_private_key)
            .ok_or(Error::InvalidPublicKey { step: Step::KeyAgreement })?;
        let encoded_ephemeral_public_key = suite.encode_point(&session_curve, &ephemeral_public_key, Step::KeyAgreement)?;
        Ok(Step3 {
            suite,
            session_curve,
            ephemeral_private_key: Zeroizing::new(ephemeral_private_key),
            encoded_ephemeral_public_key,
        })
    }
}


/// The session generator is known; the ephemeral public keys are being exchanged.
pub struct Step3 {
    suite: Suite,
    session_curve: PrimeWeierstrassCurve,
    ephemeral_private_key: Zeroizing<BoxedUint>,
    encoded_ephemeral_public_key: Zeroizing<Vec<u8>>,
}
impl Step3 {
    /// The terminal's ephemeral public key in uncompressed encoding.
    pub fn encoded_public_key_pcd(&self) -> &[u8] {
        &self.encoded_ephemeral_public_key
    }

    /// Completes the key agreement and derives the session keys and authentication tokens.
    pub fn decode_public_key_icc(self, public_key_icc: &[u8]) -> Result<Step4, Error> {
        let step = Step::KeyAgreement;
        if public_key_icc == self.encoded_ephemeral_public_key.as_slice() {
            return Err(Error::KeysEqual { step });
        }
        let icc_point = self.session_curve.decode_point(public_key_icc)
            .ok_or(Error::InvalidPublicKey { step })?;
        let shared_point = self.session_curve.diffie_hellman(&self.ephemeral_private_key, &icc_point)
            .ok_or(Error::InvalidPublicKey { step })?;

        let field_size = self.session_curve.field_size_bytes();
        let shared_x = shared_point.x_bytes(field_size)
            .ok_or(Error::InvalidPublicKey { step })?;
        let shared_secret = strip_leading_zeros(&shared_x);
        trace!("shared secret:\n{}", hexdump(shared_secret));

        let enc_key = self.suite.cipher.derive_encryption_key(shared_secret);
        let mac_key = self.suite.cipher.derive_mac_key(shared_secret);

        // each side authenticates the other side's ephemeral public key
        let token_pcd = self.suite.cipher
            .mac(&self.suite.authentication_token_input(public_key_icc), &mac_key)
            .map_err(|error| Error::Crypto { step, error })?;
        let token_icc_input = self.suite.authentication_token_input(&self.encoded_ephemeral_public_key);

        let id_icc = icc_point.to_compressed_bytes(field_size)
            .ok_or(Error::InvalidPublicKey { step })?
            .to_vec();

        Ok(Step4 {
            suite: self.suite,
            enc_key,
            mac_key,
            token_pcd,
            token_icc_input,
            id_icc,
        })
    }
}


/// The session keys are known; the authentication tokens are being exchanged.
pub struct Step4 {
    suite: Suite,
    enc_key: Zeroizing<Vec<u8>>,
    mac_key: Zeroizing<Vec<u8>>,
    token_pcd: Zeroizing<Vec<u8>>,
    token_icc_input: Vec<u8>,
    id_icc: Vec<u8>,
}
impl Step4 {
    /// The terminal's authentication token `T_PCD`.
    pub fn authentication_token_pcd(&self) -> &[u8] {
        &self.token_pcd
    }

    /// Checks the card's authentication token `T_PICC` in constant time.
    pub fn verify_token_icc(self, token_icc: &[u8]) -> Result<PaceResult, Error> {
        let valid = self.suite.cipher.verify_mac(&self.token_icc_input, &self.mac_key, token_icc)
            .map_err(|error| Error::Crypto { step: Step::MutualAuthentication, error })?;
        if !valid {
            return Err(Error::MutualAuthentication);
        }
        Ok(PaceResult {
            enc_key: self.enc_key,
            mac_key: self.mac_key,
            id_icc: self.id_icc,
        })
    }
}


/// The outcome of a successful key agreement.
#[derive(Clone, Eq, PartialEq)]
pub struct PaceResult {
    pub enc_key: Zeroizing<Vec<u8>>,
    pub mac_key: Zeroizing<Vec<u8>>,

    /// The card's compressed ephemeral public key, used to identify the card in later protocols.
    pub id_icc: Vec<u8>,
}
impl fmt::Debug for PaceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaceResult")
            .field("enc_key", &"<redacted>")
            .field("mac_key", &"<redacted>")
            .field("id_icc", &self.id_icc)
            .finish()
    }
}
