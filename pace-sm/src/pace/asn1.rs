//! ASN.1 structures relevant to PACE.


use rasn::{AsnType, Decode, Decoder, Encode};
use rasn::types::ObjectIdentifier;
use tracing::debug;

use crate::der_util::{self, BorrowedTlv};
use crate::pace::Error;
use crate::pace::kdf::KdfLength;
use crate::pace::oids;


/// DER tag of SET (constructed).
const TAG_SET: u32 = 0x31;

/// DER tag of SEQUENCE (constructed).
const TAG_SEQUENCE: u32 = 0x30;

/// DER tag of OBJECT IDENTIFIER.
const TAG_OID: u32 = 0x06;


/// An item of PACE-related security information in the `EF.CardAccess` file.
///
/// ```asn1
/// PACEInfo ::= SEQUENCE {
///     protocol    OBJECT IDENTIFIER(id-PACE-...),
///     version     INTEGER, -- SHOULD be 2
///     parameterId INTEGER OPTIONAL
/// }
/// ```
///
/// Specified in BSI TR-03110 Part 3 § A.1.1.1.
#[derive(AsnType, Clone, Debug, Decode, Encode, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PaceInfo {
    pub protocol: ObjectIdentifier,
    pub version: u32,
    pub parameter_id: Option<u32>,
}
impl PaceInfo {
    pub fn new(protocol: ObjectIdentifier, version: u32, parameter_id: Option<u32>) -> Self {
        Self {
            protocol,
            version,
            parameter_id,
        }
    }

    /// Whether this entry describes ECDH Generic Mapping with AES.
    pub fn is_supported(&self) -> bool {
        oids::is_supported(&self.protocol)
    }

    /// The key length announced by the protocol identifier.
    pub fn kdf_length(&self) -> Option<KdfLength> {
        KdfLength::from_protocol(&self.protocol)
    }
}


/// Decodes `EF.CardAccess` and returns every supported [`PaceInfo`] in file order.
///
/// `EF.CardAccess` is a DER-encoded `SET OF SecurityInfo`; each `SecurityInfo` is a SEQUENCE
/// starting with a protocol OID whose remaining members depend on the protocol. Entries of other
/// protocols are skipped without being interpreted.
pub fn parse_card_access(card_access: &[u8]) -> Result<Vec<PaceInfo>, Error> {
    let (set, rest) = BorrowedTlv::try_from_slice(card_access)
        .ok_or(Error::CardAccessStructure)?;
    if set.tag != TAG_SET || !rest.iter().all(|b| *b == 0x00) {
        return Err(Error::CardAccessStructure);
    }
    let security_infos = der_util::parse_tlvs(set.data)
        .ok_or(Error::CardAccessStructure)?;

    let mut supported = Vec::new();
    let mut unsupported = None;
    for security_info in security_infos {
        if security_info.tag != TAG_SEQUENCE {
            return Err(Error::CardAccessStructure);
        }
        let members = der_util::parse_tlvs(security_info.data)
            .ok_or(Error::CardAccessStructure)?;
        let Some(protocol_tlv) = members.first() else {
            return Err(Error::CardAccessStructure);
        };
        if protocol_tlv.tag != TAG_OID {
            return Err(Error::CardAccessStructure);
        }

        let mut protocol_der = Vec::with_capacity(protocol_tlv.tag_and_length.len() + protocol_tlv.data.len());
        protocol_tlv.write_to(&mut protocol_der);
        let protocol: ObjectIdentifier = rasn::der::decode(&protocol_der)
            .map_err(Error::CardAccessDecoding)?;
        if oids::classify(&protocol).is_none() {
            continue;
        }
        if !oids::is_supported(&protocol) {
            debug!("skipping unsupported PACE protocol {:?}", protocol);
            unsupported.get_or_insert(protocol);
            continue;
        }

        let mut info_der = Vec::new();
        security_info.write_to(&mut info_der);
        let pace_info: PaceInfo = rasn::der::decode(&info_der)
            .map_err(Error::CardAccessDecoding)?;
        supported.push(pace_info);
    }

    if supported.is_empty() {
        return Err(match unsupported {
            Some(protocol) => Error::MappingNotSupported { protocol },
            None => Error::NotSupported,
        });
    }
    Ok(supported)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::pace::oids::ID_PACE_ECDH_GM_AES_CBC_CMAC_128;
    use hex_literal::hex;

    #[test]
    fn icao_doc9303_part11_secg1_card_access() {
        let card_access = hex!("31143012060A04007F0007020204020202010202010D");
        let infos = parse_card_access(&card_access).unwrap();
        assert_eq!(
            infos,
            vec![PaceInfo::new(ID_PACE_ECDH_GM_AES_CBC_CMAC_128.to_owned(), 2, Some(13))],
        );
        assert_eq!(infos[0].kdf_length(), Some(KdfLength::Bits128));
    }

    #[test]
    fn other_security_infos_are_skipped() {
        // a TerminalAuthenticationInfo (id-TA, version 2) ahead of the PACEInfo
        let card_access = hex!("
            3123
            300D 0608 04007F0007020202 020102
            3012 060A 04007F00070202040202 020102 02010D
        ");
        let infos = parse_card_access(&card_access).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].parameter_id, Some(13));
    }

    #[test]
    fn only_unsupported_mappings() {
        // id-PACE-ECDH-IM-AES-CBC-CMAC-128
        let card_access = hex!("31143012060A04007F0007020204040202010202010D");
        assert!(matches!(parse_card_access(&card_access), Err(Error::MappingNotSupported { .. })));
    }

    #[test]
    fn no_pace() {
        let card_access = hex!("310F 300D 0608 04007F0007020202 020102");
        assert!(matches!(parse_card_access(&card_access), Err(Error::NotSupported)));
    }

    #[test]
    fn malformed() {
        assert!(matches!(parse_card_access(&hex!("3014 3012")), Err(Error::CardAccessStructure)));
        assert!(matches!(parse_card_access(&hex!("3000")), Err(Error::CardAccessStructure)));
        assert!(matches!(parse_card_access(&hex!("3103 020102")), Err(Error::CardAccessStructure)));
    }
}
