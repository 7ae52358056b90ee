//! Running PACE against a card.


use std::fmt;

use crypto_bigint::BoxedUint;
use rand::{CryptoRng, RngCore};
use rand::rngs::OsRng;
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

use crate::iso7816::apdu::{Apdu, Response};
use crate::iso7816::card::SmartCard;
use crate::iso7816::status::StatusWord;
use crate::pace::{Error, MseStatus, PaceParameters, PacePinId, Step};
use crate::pace::apdus;
use crate::pace::asn1::PaceInfo;
use crate::pace::crypto_suite::{Start, Step1, Step2, Step3};
use crate::secure_messaging::{self, SecureMessaging, SecureMessagingCard};


/// Where the terminal's private keys come from.
enum KeySource<'r, R> {
    Random(&'r mut R),
    Fixed {
        mapping: Zeroizing<BoxedUint>,
        ephemeral: Zeroizing<BoxedUint>,
    },
}
impl<'r, R: RngCore + CryptoRng> KeySource<'r, R> {
    fn decrypt_nonce(&mut self, step1: Step1, encrypted_nonce: &[u8]) -> Result<Step2, Error> {
        match self {
            Self::Random(rng) => step1.decrypt_nonce(encrypted_nonce, &mut **rng),
            Self::Fixed { mapping, .. } => step1.decrypt_nonce_with_private_key(encrypted_nonce, (**mapping).clone()),
        }
    }

    fn map_public_key_icc(&mut self, step2: Step2, map_public_key_icc: &[u8]) -> Result<Step3, Error> {
        match self {
            Self::Random(rng) => step2.map_public_key_icc(map_public_key_icc, &mut **rng),
            Self::Fixed { ephemeral, .. } => step2.map_public_key_icc_with_private_key(map_public_key_icc, (**ephemeral).clone()),
        }
    }
}


/// Everything a successful PACE run produces.
#[derive(Clone, Eq, PartialEq)]
pub struct ProcessResult {
    pub mse_status: MseStatus,
    pub enc_key: Zeroizing<Vec<u8>>,
    pub mac_key: Zeroizing<Vec<u8>>,

    /// Most recent certification authority reference; present if a CHAT was sent.
    pub current_car: Option<Vec<u8>>,

    /// Previous certification authority reference, if the card returned one.
    pub previous_car: Option<Vec<u8>>,

    /// The card's ephemeral public key in compressed encoding.
    pub id_icc: Vec<u8>,
}
impl ProcessResult {
    /// A Secure Messaging engine keyed with the session keys, in the default configuration.
    pub fn secure_messaging(&self) -> Result<SecureMessaging, secure_messaging::Error> {
        SecureMessaging::from_session_keys(&self.enc_key, &self.mac_key)
    }

    /// Wraps the card into a secure channel keyed with the session keys.
    ///
    /// Consumes the result so the keys only remain inside the channel.
    pub fn into_secure_card<SC: SmartCard>(self, card: SC) -> Result<SecureMessagingCard<SC>, secure_messaging::Error> {
        let engine = self.secure_messaging()?;
        Ok(SecureMessagingCard::new(card, engine))
    }
}
impl fmt::Debug for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessResult")
            .field("mse_status", &self.mse_status)
            .field("enc_key", &"<redacted>")
            .field("mac_key", &"<redacted>")
            .field("current_car", &self.current_car)
            .field("previous_car", &self.previous_car)
            .field("id_icc", &self.id_icc)
            .finish()
    }
}


/// Drives MSE:Set AT and the four GENERAL AUTHENTICATE round trips.
#[derive(Debug)]
pub struct PaceProcess {
    parameters: PaceParameters,
    pace_info: PaceInfo,
}
impl PaceProcess {
    pub fn new(parameters: PaceParameters, pace_info: PaceInfo) -> Self {
        Self {
            parameters,
            pace_info,
        }
    }

    pub fn parameters(&self) -> &PaceParameters { &self.parameters }
    pub fn pace_info(&self) -> &PaceInfo { &self.pace_info }

    /// Runs PACE with keys from the operating system's random number generator.
    pub fn execute<SC: SmartCard>(&self, card: &mut SC) -> Result<ProcessResult, Error> {
        let mut rng = OsRng;
        self.execute_with_rng(card, &mut rng)
    }

    /// Runs PACE with keys from the given random number generator.
    pub fn execute_with_rng<SC: SmartCard, R: RngCore + CryptoRng>(&self, card: &mut SC, rng: &mut R) -> Result<ProcessResult, Error> {
        self.run(card, KeySource::Random(rng))
    }

    /// Runs PACE with fixed private keys for the mapping and the key agreement.
    ///
    /// Only useful for reproducing recorded runs.
    pub fn execute_with_private_keys<SC: SmartCard>(
        &self,
        card: &mut SC,
        mapping_private_key: BoxedUint,
        ephemeral_private_key: BoxedUint,
    ) -> Result<ProcessResult, Error> {
        let keys: KeySource<'_, OsRng> = KeySource::Fixed {
            mapping: Zeroizing::new(mapping_private_key),
            ephemeral: Zeroizing::new(ephemeral_private_key),
        };
        self.run(card, keys)
    }

    #[instrument(skip_all, fields(pin_id = ?self.parameters.pin_id, protocol = ?self.pace_info.protocol))]
    fn run<SC: SmartCard, R: RngCore + CryptoRng>(&self, card: &mut SC, mut keys: KeySource<'_, R>) -> Result<ProcessResult, Error> {
        let start = Start::new(&self.pace_info, self.parameters.parameter_id.map(u32::from))?;
        let step1 = start.derive_password_key(self.parameters.pin_id, &self.parameters.password)?;

        let mse_status = self.set_authentication_template(card)?;

        // GA 1: encrypted nonce
        let response = transmit(card, Step::EncryptedNonce, &apdus::ga_encrypted_nonce())?;
        ensure_success(Step::EncryptedNonce, &response)?;
        let encrypted_nonce = apdus::to_encrypted_nonce(&response)?;
        let step2 = keys.decrypt_nonce(step1, &encrypted_nonce)?;

        // GA 2: mapping
        let response = transmit(card, Step::MapNonce, &apdus::ga_map_nonce(step2.map_public_key_pcd()))?;
        ensure_success(Step::MapNonce, &response)?;
        let map_public_key_icc = apdus::to_map_nonce(&response)?;
        let step3 = keys.map_public_key_icc(step2, &map_public_key_icc)?;

        // GA 3: key agreement
        let response = transmit(card, Step::KeyAgreement, &apdus::ga_key_agreement(step3.encoded_public_key_pcd()))?;
        ensure_success(Step::KeyAgreement, &response)?;
        let public_key_icc = apdus::to_key_agreement(&response)?;
        let step4 = step3.decode_public_key_icc(&public_key_icc)?;

        // GA 4: mutual authentication
        let response = transmit(card, Step::MutualAuthentication, &apdus::ga_mutual_authentication(step4.authentication_token_pcd()))?;
        ensure_success(Step::MutualAuthentication, &response)?;
        let token_response = apdus::to_authentication_token(&response, self.parameters.chat.is_some())?;
        let session_keys = step4.verify_token_icc(&token_response.token)?;
        debug!("PACE established");

        Ok(ProcessResult {
            mse_status,
            enc_key: session_keys.enc_key,
            mac_key: session_keys.mac_key,
            current_car: token_response.current_car,
            previous_car: token_response.previous_car,
            id_icc: session_keys.id_icc,
        })
    }

    fn set_authentication_template<SC: SmartCard>(&self, card: &mut SC) -> Result<MseStatus, Error> {
        let request = apdus::mse_set_at(
            &self.pace_info.protocol,
            self.parameters.pin_id,
            self.parameters.parameter_id,
            self.parameters.chat.as_deref(),
            self.parameters.certificate_description.as_deref(),
        );
        let response = transmit(card, Step::MseSetAt, &request)?;
        match response.status() {
            StatusWord::Success => Ok(MseStatus::Success),
            StatusWord::CounterValue(0) if self.parameters.pin_id == PacePinId::Puk => {
                warn!("PIN is blocked, unblocking it with the PUK");
                Ok(MseStatus::Blocked)
            },
            StatusWord::CounterValue(remaining) if remaining > 0 => {
                warn!("password has {} tries remaining", remaining);
                Ok(MseStatus::Retry { remaining })
            },
            status => Err(password_status_error(Step::MseSetAt, status)),
        }
    }
}


fn transmit<SC: SmartCard>(card: &mut SC, step: Step, request: &Apdu) -> Result<Response, Error> {
    debug!("sending {}", step);
    let response = card.communicate(request)
        .map_err(|error| Error::Communication { step, error })?;
    debug!("{} answered {}", step, response.status());
    Ok(response)
}

fn ensure_success(step: Step, response: &Response) -> Result<(), Error> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(password_status_error(step, status))
    }
}

/// Classifies a failing status word, singling out the password states.
fn password_status_error(step: Step, status: StatusWord) -> Error {
    match status {
        StatusWord::CounterValue(0) => {
            warn!("password is blocked");
            Error::PinBlocked { step }
        },
        StatusWord::CounterValue(1) => {
            warn!("password is suspended");
            Error::PinSuspended { step }
        },
        StatusWord::CounterValue(remaining) => {
            warn!("card rejected the password, {} tries remaining", remaining);
            Error::WrongPassword { step, remaining }
        },
        StatusWord::SelectedFileDeactivated => {
            warn!("password is deactivated");
            Error::PinDeactivated { step }
        },
        status => Error::OperationFailed { step, status },
    }
}
