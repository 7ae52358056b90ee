//! Domain parameters of the elliptic curves standardized for PACE.
//!
//! Parameter IDs are those of BSI TR-03110 Part 3 Table 4 and ICAO Document 9303 Part 11
//! Section 9.5.1. Only curves in short Weierstrass form over prime fields are listed.


use hex_literal::hex;

use crate::crypt::elliptic::PrimeWeierstrassCurve;


/// Big-endian encoded parameters of a curve.
///
/// All field elements (prime, coefficients, generator coordinates) have the same length.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CurveDomain {
    pub prime: &'static [u8],
    pub coefficient_a: &'static [u8],
    pub coefficient_b: &'static [u8],
    pub generator_x: &'static [u8],
    pub generator_y: &'static [u8],
    pub order: &'static [u8],
    pub cofactor: u8,
}
impl CurveDomain {
    pub fn to_curve(&self) -> Option<PrimeWeierstrassCurve> {
        PrimeWeierstrassCurve::from_be_slices(
            self.prime,
            self.coefficient_a,
            self.coefficient_b,
            self.generator_x,
            self.generator_y,
            self.order,
            self.cofactor,
        )
    }
}


/// Returns the domain parameters for a standardized domain parameter ID.
pub fn domain_for_parameter_id(parameter_id: u32) -> Option<&'static CurveDomain> {
    match parameter_id {
        8 => Some(&NIST_P192),
        9 => Some(&BRAINPOOL_P192R1),
        10 => Some(&NIST_P224),
        11 => Some(&BRAINPOOL_P224R1),
        12 => Some(&NIST_P256),
        13 => Some(&BRAINPOOL_P256R1),
        14 => Some(&BRAINPOOL_P320R1),
        15 => Some(&NIST_P384),
        16 => Some(&BRAINPOOL_P384R1),
        17 => Some(&BRAINPOOL_P512R1),
        18 => Some(&NIST_P521),
        // 0-2 are MODP groups, 3-7 are RFU
        _ => None,
    }
}


/// Returns the curve for a standardized domain parameter ID.
pub fn curve_for_parameter_id(parameter_id: u32) -> Option<PrimeWeierstrassCurve> {
    domain_for_parameter_id(parameter_id)
        .and_then(|domain| domain.to_curve())
}


/// NIST P-192 (secp192r1), standardized domain parameter ID 8.
pub const NIST_P192: CurveDomain = CurveDomain {
    prime: &hex!("FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFE FFFFFFFF FFFFFFFF"),
    coefficient_a: &hex!("FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFE FFFFFFFF FFFFFFFC"),
    coefficient_b: &hex!("64210519 E59C80E7 0FA7E9AB 72243049 FEB8DEEC C146B9B1"),
    generator_x: &hex!("188DA80E B03090F6 7CBF20EB 43A18800 F4FF0AFD 82FF1012"),
    generator_y: &hex!("07192B95 FFC8DA78 631011ED 6B24CDD5 73F977A1 1E794811"),
    order: &hex!("FFFFFFFF FFFFFFFF FFFFFFFF 99DEF836 146BC9B1 B4D22831"),
    cofactor: 1,
};

/// brainpoolP192r1, standardized domain parameter ID 9.
pub const BRAINPOOL_P192R1: CurveDomain = CurveDomain {
    prime: &hex!("C302F41D 932A36CD A7A34630 93D18DB7 8FCE476D E1A86297"),
    coefficient_a: &hex!("6A911740 76B1E0E1 9C39C031 FE8685C1 CAE040E5 C69A28EF"),
    coefficient_b: &hex!("469A28EF 7C28CCA3 DC721D04 4F4496BC CA7EF414 6FBF25C9"),
    generator_x: &hex!("C0A0647E AAB6A487 53B033C5 6CB0F090 0A2F5C48 53375FD6"),
    generator_y: &hex!("14B69086 6ABD5BB8 8B5F4828 C1490002 E6773FA2 FA299B8F"),
    order: &hex!("C302F41D 932A36CD A7A3462F 9E9E916B 5BE8F102 9AC4ACC1"),
    cofactor: 1,
};

/// NIST P-224 (secp224r1), standardized domain parameter ID 10.
pub const NIST_P224: CurveDomain = CurveDomain {
    prime: &hex!("FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF 00000000 00000000 00000001"),
    coefficient_a: &hex!("FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFE FFFFFFFF FFFFFFFF FFFFFFFE"),
    coefficient_b: &hex!("B4050A85 0C04B3AB F5413256 5044B0B7 D7BFD8BA 270B3943 2355FFB4"),
    generator_x: &hex!("B70E0CBD 6BB4BF7F 321390B9 4A03C1D3 56C21122 343280D6 115C1D21"),
    generator_y: &hex!("BD376388 B5F723FB 4C22DFE6 CD4375A0 5A074764 44D58199 85007E34"),
    order: &hex!("FFFFFFFF FFFFFFFF FFFFFFFF FFFF16A2 E0B8F03E 13DD2945 5C5C2A3D"),
    cofactor: 1,
};

/// brainpoolP224r1, standardized domain parameter ID 11.
pub const BRAINPOOL_P224R1: CurveDomain = CurveDomain {
    prime: &hex!("D7C134AA 26436686 2A183025 75D1D787 B09F0757 97DA89F5 7EC8C0FF"),
    coefficient_a: &hex!("68A5E62C A9CE6C1C 299803A6 C1530B51 4E182AD8 B0042A59 CAD29F43"),
    coefficient_b: &hex!("2580F63C CFE44138 870713B1 A92369E3 3E2135D2 66DBB372 386C400B"),
    generator_x: &hex!("0D9029AD 2C7E5CF4 340823B2 A87DC68C 9E4CE317 4C1E6EFD EE12C07D"),
    generator_y: &hex!("58AA56F7 72C0726F 24C6B89E 4ECDAC24 354B9E99 CAA3F6D3 761402CD"),
    order: &hex!("D7C134AA 26436686 2A183025 75D0FB98 D116BC4B 6DDEBCA3 A5A7939F"),
    cofactor: 1,
};

/// NIST P-256 (secp256r1), standardized domain parameter ID 12.
pub const NIST_P256: CurveDomain = CurveDomain {
    prime: &hex!("FFFFFFFF 00000001 00000000 00000000 00000000 FFFFFFFF FFFFFFFF FFFFFFFF"),
    coefficient_a: &hex!("FFFFFFFF 00000001 00000000 00000000 00000000 FFFFFFFF FFFFFFFF FFFFFFFC"),
    coefficient_b: &hex!("5AC635D8 AA3A93E7 B3EBBD55 769886BC 651D06B0 CC53B0F6 3BCE3C3E 27D2604B"),
    generator_x: &hex!("6B17D1F2 E12C4247 F8BCE6E5 63A440F2 77037D81 2DEB33A0 F4A13945 D898C296"),
    generator_y: &hex!("4FE342E2 FE1A7F9B 8EE7EB4A 7C0F9E16 2BCE3357 6B315ECE CBB64068 37BF51F5"),
    order: &hex!("FFFFFFFF 00000000 FFFFFFFF FFFFFFFF BCE6FAAD A7179E84 F3B9CAC2 FC632551"),
    cofactor: 1,
};

/// brainpoolP256r1, standardized domain parameter ID 13.
pub const BRAINPOOL_P256R1: CurveDomain = CurveDomain {
    prime: &hex!("A9FB57DB A1EEA9BC 3E660A90 9D838D72 6E3BF623 D5262028 2013481D 1F6E5377"),
    coefficient_a: &hex!("7D5A0975 FC2C3057 EEF67530 417AFFE7 FB8055C1 26DC5C6C E94A4B44 F330B5D9"),
    coefficient_b: &hex!("26DC5C6C E94A4B44 F330B5D9 BBD77CBF 95841629 5CF7E1CE 6BCCDC18 FF8C07B6"),
    generator_x: &hex!("8BD2AEB9 CB7E57CB 2C4B482F FC81B7AF B9DE27E1 E3BD23C2 3A4453BD 9ACE3262"),
    generator_y: &hex!("547EF835 C3DAC4FD 97F8461A 14611DC9 C2774513 2DED8E54 5C1D54C7 2F046997"),
    order: &hex!("A9FB57DB A1EEA9BC 3E660A90 9D838D71 8C397AA3 B561A6F7 901E0E82 974856A7"),
    cofactor: 1,
};

/// brainpoolP320r1, standardized domain parameter ID 14.
pub const BRAINPOOL_P320R1: CurveDomain = CurveDomain {
    prime: &hex!("
        D35E4720 36BC4FB7 E13C785E D201E065 F98FCFA6 F6F40DEF 4F92B9EC 7893EC28
        FCD412B1 F1B32E27
    "),
    coefficient_a: &hex!("
        3EE30B56 8FBAB0F8 83CCEBD4 6D3F3BB8 A2A73513 F5EB79DA 66190EB0 85FFA9F4
        92F375A9 7D860EB4
    "),
    coefficient_b: &hex!("
        52088394 9DFDBC42 D3AD1986 40688A6F E13F4134 9554B49A CC31DCCD 88453981
        6F5EB4AC 8FB1F1A6
    "),
    generator_x: &hex!("
        43BD7E9A FB53D8B8 5289BCC4 8EE5BFE6 F20137D1 0A087EB6 E7871E2A 10A599C7
        10AF8D0D 39E20611
    "),
    generator_y: &hex!("
        14FDD055 45EC1CC8 AB409324 7F77275E 0743FFED 117182EA A9C77877 AAAC6AC7
        D35245D1 692E8EE1
    "),
    order: &hex!("
        D35E4720 36BC4FB7 E13C785E D201E065 F98FCFA5 B68F12A3 2D482EC7 EE8658E9
        8691555B 44C59311
    "),
    cofactor: 1,
};

/// NIST P-384 (secp384r1), standardized domain parameter ID 15.
pub const NIST_P384: CurveDomain = CurveDomain {
    prime: &hex!("
        FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFE
        FFFFFFFF 00000000 00000000 FFFFFFFF
    "),
    coefficient_a: &hex!("
        FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFE
        FFFFFFFF 00000000 00000000 FFFFFFFC
    "),
    coefficient_b: &hex!("
        B3312FA7 E23EE7E4 988E056B E3F82D19 181D9C6E FE814112 0314088F 5013875A
        C656398D 8A2ED19D 2A85C8ED D3EC2AEF
    "),
    generator_x: &hex!("
        AA87CA22 BE8B0537 8EB1C71E F320AD74 6E1D3B62 8BA79B98 59F741E0 82542A38
        5502F25D BF55296C 3A545E38 72760AB7
    "),
    generator_y: &hex!("
        3617DE4A 96262C6F 5D9E98BF 9292DC29 F8F41DBD 289A147C E9DA3113 B5F0B8C0
        0A60B1CE 1D7E819D 7A431D7C 90EA0E5F
    "),
    order: &hex!("
        FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF C7634D81 F4372DDF
        581A0DB2 48B0A77A ECEC196A CCC52973
    "),
    cofactor: 1,
};

/// brainpoolP384r1, standardized domain parameter ID 16.
pub const BRAINPOOL_P384R1: CurveDomain = CurveDomain {
    prime: &hex!("
        8CB91E82 A3386D28 0F5D6F7E 50E641DF 152F7109 ED5456B4 12B1DA19 7FB71123
        ACD3A729 901D1A71 87470013 3107EC53
    "),
    coefficient_a: &hex!("
        7BC382C6 3D8C150C 3C72080A CE05AFA0 C2BEA28E 4FB22787 139165EF BA91F90F
        8AA5814A 503AD4EB 04A8C7DD 22CE2826
    "),
    coefficient_b: &hex!("
        04A8C7DD 22CE2826 8B39B554 16F0447C 2FB77DE1 07DCD2A6 2E880EA5 3EEB62D5
        7CB43902 95DBC994 3AB78696 FA504C11
    "),
    generator_x: &hex!("
        1D1C64F0 68CF45FF A2A63A81 B7C13F6B 8847A3E7 7EF14FE3 DB7FCAFE 0CBD10E8
        E826E034 36D646AA EF87B2E2 47D4AF1E
    "),
    generator_y: &hex!("
        8ABE1D75 20F9C2A4 5CB1EB8E 95CFD552 62B70B29 FEEC5864 E19C054F F9912928
        0E464621 77918111 42820341 263C5315
    "),
    order: &hex!("
        8CB91E82 A3386D28 0F5D6F7E 50E641DF 152F7109 ED5456B3 1F166E6C AC0425A7
        CF3AB6AF 6B7FC310 3B883202 E9046565
    "),
    cofactor: 1,
};

/// brainpoolP512r1, standardized domain parameter ID 17.
pub const BRAINPOOL_P512R1: CurveDomain = CurveDomain {
    prime: &hex!("
        AADD9DB8 DBE9C48B 3FD4E6AE 33C9FC07 CB308DB3 B3C9D20E D6639CCA 70330871
        7D4D9B00 9BC66842 AECDA12A E6A380E6 2881FF2F 2D82C685 28AA6056 583A48F3
    "),
    coefficient_a: &hex!("
        7830A331 8B603B89 E2327145 AC234CC5 94CBDD8D 3DF91610 A83441CA EA9863BC
        2DED5D5A A8253AA1 0A2EF1C9 8B9AC8B5 7F1117A7 2BF2C7B9 E7C1AC4D 77FC94CA
    "),
    coefficient_b: &hex!("
        3DF91610 A83441CA EA9863BC 2DED5D5A A8253AA1 0A2EF1C9 8B9AC8B5 7F1117A7
        2BF2C7B9 E7C1AC4D 77FC94CA DC083E67 984050B7 5EBAE5DD 2809BD63 8016F723
    "),
    generator_x: &hex!("
        81AEE4BD D82ED964 5A21322E 9C4C6A93 85ED9F70 B5D916C1 B43B62EE F4D0098E
        FF3B1F78 E2D0D48D 50D1687B 93B97D5F 7C6D5047 406A5E68 8B352209 BCB9F822
    "),
    generator_y: &hex!("
        7DDE385D 566332EC C0EABFA9 CF7822FD F209F700 24A57B1A A000C55B 881F8111
        B2DCDE49 4A5F485E 5BCA4BD8 8A2763AE D1CA2B2F A8F05406 78CD1E0F 3AD80892
    "),
    order: &hex!("
        AADD9DB8 DBE9C48B 3FD4E6AE 33C9FC07 CB308DB3 B3C9D20E D6639CCA 70330870
        553E5C41 4CA92619 41866119 7FAC1047 1DB1D381 085DDADD B5879682 9CA90069
    "),
    cofactor: 1,
};

/// NIST P-521 (secp521r1), standardized domain parameter ID 18.
pub const NIST_P521: CurveDomain = CurveDomain {
    prime: &hex!("
        01FFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF
        FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF
        FFFF
    "),
    coefficient_a: &hex!("
        01FFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF
        FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF
        FFFC
    "),
    coefficient_b: &hex!("
        0051953E B9618E1C 9A1F929A 21A0B685 40EEA2DA 725B99B3 15F3B8B4 89918EF1
        09E15619 3951EC7E 937B1652 C0BD3BB1 BF073573 DF883D2C 34F1EF45 1FD46B50
        3F00
    "),
    generator_x: &hex!("
        00C6858E 06B70404 E9CD9E3E CB662395 B4429C64 8139053F B521F828 AF606B4D
        3DBAA14B 5E77EFE7 5928FE1D C127A2FF A8DE3348 B3C1856A 429BF97E 7E31C2E5
        BD66
    "),
    generator_y: &hex!("
        01183929 6A789A3B C0045C8A 5FB42C7D 1BD998F5 4449579B 446817AF BD17273E
        662C97EE 72995EF4 2640C550 B9013FAD 0761353C 7086A272 C24088BE 94769FD1
        6650
    "),
    order: &hex!("
        01FFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF
        FFFA5186 8783BF2F 966B7FCC 0148F709 A5D03BB5 C9B8899C 47AEBB6F B71E9138
        6409
    "),
    cofactor: 1,
};
