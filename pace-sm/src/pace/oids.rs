//! Object identifiers of the PACE protocol family (`id-PACE`, BSI TR-03110 Part 3 § A.1.1.1).


use rasn::types::Oid;


macro_rules! pace_oid {
    ($name:ident $(, $number:expr)* $(,)?) => {
        pub const $name: &'static Oid = Oid::const_new(&[0, 4, 0, 127, 0, 7, 2, 2, 4 $(, $number)*]);
    };
}

pace_oid!(ID_PACE);

pace_oid!(ID_PACE_DH_GM_3DES_CBC_CBC,           1, 1);
pace_oid!(ID_PACE_DH_GM_AES_CBC_CMAC_128,       1, 2);
pace_oid!(ID_PACE_DH_GM_AES_CBC_CMAC_192,       1, 3);
pace_oid!(ID_PACE_DH_GM_AES_CBC_CMAC_256,       1, 4);

pace_oid!(ID_PACE_ECDH_GM_3DES_CBC_CBC,         2, 1);
pace_oid!(ID_PACE_ECDH_GM_AES_CBC_CMAC_128,     2, 2);
pace_oid!(ID_PACE_ECDH_GM_AES_CBC_CMAC_192,     2, 3);
pace_oid!(ID_PACE_ECDH_GM_AES_CBC_CMAC_256,     2, 4);

pace_oid!(ID_PACE_DH_IM_3DES_CBC_CBC,           3, 1);
pace_oid!(ID_PACE_DH_IM_AES_CBC_CMAC_128,       3, 2);
pace_oid!(ID_PACE_DH_IM_AES_CBC_CMAC_192,       3, 3);
pace_oid!(ID_PACE_DH_IM_AES_CBC_CMAC_256,       3, 4);

pace_oid!(ID_PACE_ECDH_IM_3DES_CBC_CBC,         4, 1);
pace_oid!(ID_PACE_ECDH_IM_AES_CBC_CMAC_128,     4, 2);
pace_oid!(ID_PACE_ECDH_IM_AES_CBC_CMAC_192,     4, 3);
pace_oid!(ID_PACE_ECDH_IM_AES_CBC_CMAC_256,     4, 4);

pace_oid!(ID_PACE_ECDH_CAM_AES_CBC_CMAC_128,    6, 2);
pace_oid!(ID_PACE_ECDH_CAM_AES_CBC_CMAC_192,    6, 3);
pace_oid!(ID_PACE_ECDH_CAM_AES_CBC_CMAC_256,    6, 4);


/// The mapping function named by a PACE protocol identifier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Mapping {
    DhGeneric,
    EcdhGeneric,
    DhIntegrated,
    EcdhIntegrated,
    EcdhChipAuthentication,
}


/// The symmetric algorithm named by a PACE protocol identifier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SymmetricAlgorithm {
    TripleDes,
    Aes128,
    Aes192,
    Aes256,
}


/// Splits a PACE protocol identifier into its mapping and symmetric algorithm.
///
/// Returns `None` for identifiers outside `id-PACE` or with unassigned arcs.
pub fn classify(protocol: &Oid) -> Option<(Mapping, SymmetricAlgorithm)> {
    let prefix_length = ID_PACE.len();
    if protocol.len() != prefix_length + 2 || protocol[..prefix_length] != ID_PACE[..] {
        return None;
    }
    let mapping = match protocol[prefix_length] {
        1 => Mapping::DhGeneric,
        2 => Mapping::EcdhGeneric,
        3 => Mapping::DhIntegrated,
        4 => Mapping::EcdhIntegrated,
        6 => Mapping::EcdhChipAuthentication,
        _ => return None,
    };
    let algorithm = match protocol[prefix_length + 1] {
        1 if mapping != Mapping::EcdhChipAuthentication => SymmetricAlgorithm::TripleDes,
        2 => SymmetricAlgorithm::Aes128,
        3 => SymmetricAlgorithm::Aes192,
        4 => SymmetricAlgorithm::Aes256,
        _ => return None,
    };
    Some((mapping, algorithm))
}


/// Whether the identifier is one of the PACE protocols implemented by this crate, i.e. ECDH
/// Generic Mapping with AES.
pub fn is_supported(protocol: &Oid) -> bool {
    matches!(
        classify(protocol),
        Some((Mapping::EcdhGeneric, SymmetricAlgorithm::Aes128|SymmetricAlgorithm::Aes192|SymmetricAlgorithm::Aes256)),
    )
}
