//! Command APDUs of the PACE protocol and accessors for their responses.


use rasn::types::Oid;
use zeroize::Zeroizing;

use crate::der_util::{self, BorrowedTlv};
use crate::iso7816::apdu::{Apdu, CommandHeader, Data, Response};
use crate::pace::{Error, PacePinId, Step};


/// INS of MANAGE SECURITY ENVIRONMENT.
const INS_MSE: u8 = 0x22;

/// P1 of MSE:Set for mutual authentication: compute/decipher/internal authenticate/key agreement
/// and verify/encipher/external authenticate/key agreement.
const P1_SET_MUTUAL_AUTHENTICATION: u8 = 0xC1;

/// P2 of MSE:Set referencing the control reference template for authentication (AT).
const P2_AUTHENTICATION_TEMPLATE: u8 = 0xA4;

/// INS of GENERAL AUTHENTICATE.
const INS_GENERAL_AUTHENTICATE: u8 = 0x86;

/// Tag of the dynamic authentication data wrapping each GENERAL AUTHENTICATE payload.
pub const TAG_DYNAMIC_AUTHENTICATION_DATA: u8 = 0x7C;

pub const TAG_MAPPING_DATA_PCD: u8 = 0x81;
pub const TAG_EPHEMERAL_PUBLIC_KEY_PCD: u8 = 0x83;
pub const TAG_AUTHENTICATION_TOKEN_PCD: u8 = 0x85;

pub const TAG_ENCRYPTED_NONCE: u8 = 0x80;
pub const TAG_MAPPING_DATA_PICC: u8 = 0x82;
pub const TAG_EPHEMERAL_PUBLIC_KEY_PICC: u8 = 0x84;
pub const TAG_AUTHENTICATION_TOKEN_PICC: u8 = 0x86;
pub const TAG_CURRENT_CAR: u8 = 0x87;
pub const TAG_PREVIOUS_CAR: u8 = 0x88;


/// Builds MSE:Set AT selecting PACE.
///
/// `chat` and `certificate_description` are the contents of the respective templates; this function
/// adds the `7F4C` and `73` tags.
pub fn mse_set_at(
    protocol: &Oid,
    pin_id: PacePinId,
    parameter_id: Option<u8>,
    chat: Option<&[u8]>,
    certificate_description: Option<&[u8]>,
) -> Apdu {
    let mut request_data = Vec::new();

    // cryptographic mechanism reference
    der_util::encode_tlv(&mut request_data, 0x80, &der_util::oid_to_der_bytes(protocol));

    // reference of the password
    der_util::encode_tlv(&mut request_data, 0x83, &[pin_id.reference()]);

    // reference of the domain parameters, if they have to be chosen
    if let Some(parameter_id) = parameter_id {
        der_util::encode_tlv(&mut request_data, 0x84, &[parameter_id]);
    }

    if let Some(chat) = chat {
        der_util::encode_tlv(&mut request_data, 0x7F4C, chat);
    }
    if let Some(certificate_description) = certificate_description {
        der_util::encode_tlv(&mut request_data, 0x73, certificate_description);
    }

    let data = if request_data.len() > 255 {
        Data::RequestDataExtended { request_data }
    } else {
        Data::RequestDataShort { request_data }
    };
    Apdu {
        header: CommandHeader::new(0x00, INS_MSE, P1_SET_MUTUAL_AUTHENTICATION, P2_AUTHENTICATION_TEMPLATE),
        data,
    }
}


/// Builds a GENERAL AUTHENTICATE command carrying at most one data object.
///
/// All commands except the last of the PACE sequence are sent with command chaining.
pub fn general_authenticate(chained: bool, data_object: Option<(u8, &[u8])>) -> Apdu {
    let mut inner = Zeroizing::new(Vec::new());
    if let Some((tag, value)) = data_object {
        der_util::encode_tlv(&mut inner, tag.into(), value);
    }
    let mut request_data = Vec::with_capacity(inner.len() + 4);
    der_util::encode_tlv(&mut request_data, TAG_DYNAMIC_AUTHENTICATION_DATA.into(), &inner);

    let cla = if chained { 0x10 } else { 0x00 };
    Apdu {
        header: CommandHeader::new(cla, INS_GENERAL_AUTHENTICATE, 0x00, 0x00),
        data: Data::BothDataShort {
            request_data,
            response_data_length: 0,
        },
    }
}

/// GENERAL AUTHENTICATE requesting the encrypted nonce.
pub fn ga_encrypted_nonce() -> Apdu {
    general_authenticate(true, None)
}

/// GENERAL AUTHENTICATE sending the terminal's mapping public key.
pub fn ga_map_nonce(mapping_public_key: &[u8]) -> Apdu {
    general_authenticate(true, Some((TAG_MAPPING_DATA_PCD, mapping_public_key)))
}

/// GENERAL AUTHENTICATE sending the terminal's ephemeral public key.
pub fn ga_key_agreement(ephemeral_public_key: &[u8]) -> Apdu {
    general_authenticate(true, Some((TAG_EPHEMERAL_PUBLIC_KEY_PCD, ephemeral_public_key)))
}

/// GENERAL AUTHENTICATE sending the terminal's authentication token; ends the chain.
pub fn ga_mutual_authentication(token: &[u8]) -> Apdu {
    general_authenticate(false, Some((TAG_AUTHENTICATION_TOKEN_PCD, token)))
}


/// The data objects within the dynamic authentication data of a GENERAL AUTHENTICATE response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DynamicAuthenticationData {
    step: Step,
    objects: Vec<(u32, Zeroizing<Vec<u8>>)>,
}
impl DynamicAuthenticationData {
    /// Decodes `7C L { ... }` from the response data.
    pub fn parse(step: Step, response: &Response) -> Result<Self, Error> {
        let (outer, rest) = BorrowedTlv::try_from_slice(&response.data)
            .ok_or(Error::TlvSyntax { step })?;
        if outer.tag != u32::from(TAG_DYNAMIC_AUTHENTICATION_DATA) || !rest.is_empty() {
            return Err(Error::TlvSyntax { step });
        }
        let objects = der_util::parse_tlvs(outer.data)
            .ok_or(Error::TlvSyntax { step })?
            .into_iter()
            .map(|tlv| (tlv.tag, Zeroizing::new(tlv.data.to_vec())))
            .collect();
        Ok(Self { step, objects })
    }

    pub fn get(&self, tag: u8) -> Option<&[u8]> {
        self.objects.iter()
            .find(|(t, _)| *t == u32::from(tag))
            .map(|(_, value)| value.as_slice())
    }

    pub fn require(&self, tag: u8) -> Result<&[u8], Error> {
        self.get(tag)
            .ok_or(Error::MissingObject { step: self.step, tag })
    }
}


/// The encrypted nonce `z` from the first GENERAL AUTHENTICATE.
pub fn to_encrypted_nonce(response: &Response) -> Result<Zeroizing<Vec<u8>>, Error> {
    let data = DynamicAuthenticationData::parse(Step::EncryptedNonce, response)?;
    Ok(Zeroizing::new(data.require(TAG_ENCRYPTED_NONCE)?.to_vec()))
}

/// The card's mapping public key from the second GENERAL AUTHENTICATE.
pub fn to_map_nonce(response: &Response) -> Result<Vec<u8>, Error> {
    let data = DynamicAuthenticationData::parse(Step::MapNonce, response)?;
    Ok(data.require(TAG_MAPPING_DATA_PICC)?.to_vec())
}

/// The card's ephemeral public key from the third GENERAL AUTHENTICATE.
pub fn to_key_agreement(response: &Response) -> Result<Vec<u8>, Error> {
    let data = DynamicAuthenticationData::parse(Step::KeyAgreement, response)?;
    Ok(data.require(TAG_EPHEMERAL_PUBLIC_KEY_PICC)?.to_vec())
}


/// The content of the last GENERAL AUTHENTICATE response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthenticationTokenResponse {
    pub token: Vec<u8>,
    pub current_car: Option<Vec<u8>>,
    pub previous_car: Option<Vec<u8>>,
}

/// The card's authentication token and certificate authority references from the last GENERAL
/// AUTHENTICATE.
///
/// The current CAR is mandatory if a CHAT was sent in MSE:Set AT.
pub fn to_authentication_token(response: &Response, chat_sent: bool) -> Result<AuthenticationTokenResponse, Error> {
    let data = DynamicAuthenticationData::parse(Step::MutualAuthentication, response)?;
    let token = data.require(TAG_AUTHENTICATION_TOKEN_PICC)?.to_vec();
    let current_car = if chat_sent {
        Some(data.require(TAG_CURRENT_CAR)?.to_vec())
    } else {
        data.get(TAG_CURRENT_CAR).map(|car| car.to_vec())
    };
    let previous_car = data.get(TAG_PREVIOUS_CAR).map(|car| car.to_vec());
    Ok(AuthenticationTokenResponse { token, current_car, previous_car })
}
