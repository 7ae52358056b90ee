//! Elliptic-curve arithmetic on curves in short Weierstrass form over prime fields.


pub mod curves;


use std::ops::{Add, Mul};

use crypto_bigint::{BoxedUint, Integer};
use crypto_bigint::modular::{BoxedMontyForm, BoxedMontyParams};
use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroizing;
use zeroize_derive::ZeroizeOnDrop;

use crate::crypt::{be_bytes_fixed, boxed_uint_from_be_slice};


/// A point in affine coordinates.
#[derive(Clone, Debug, Eq, Hash, PartialEq, ZeroizeOnDrop)]
pub struct AffinePoint {
    x: BoxedUint,
    y: BoxedUint,
}
impl AffinePoint {
    pub const fn new(x: BoxedUint, y: BoxedUint) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> &BoxedUint { &self.x }
    pub fn y(&self) -> &BoxedUint { &self.y }

    /// Encodes the point as `04 || X || Y`, each coordinate left-padded to `field_size` bytes.
    ///
    /// Returns `None` if a coordinate does not fit.
    pub fn to_uncompressed_bytes(&self, field_size: usize) -> Option<Zeroizing<Vec<u8>>> {
        let x_bytes = be_bytes_fixed(&self.x, field_size)?;
        let y_bytes = be_bytes_fixed(&self.y, field_size)?;

        let mut ret = Zeroizing::new(Vec::with_capacity(1 + 2*field_size));
        ret.push(0x04);
        ret.extend_from_slice(&x_bytes);
        ret.extend_from_slice(&y_bytes);
        Some(ret)
    }

    /// Encodes the point as `02 || X` (even y) or `03 || X` (odd y).
    pub fn to_compressed_bytes(&self, field_size: usize) -> Option<Zeroizing<Vec<u8>>> {
        let x_bytes = be_bytes_fixed(&self.x, field_size)?;

        let mut ret = Zeroizing::new(Vec::with_capacity(1 + field_size));
        ret.push(if bool::from(self.y.is_odd()) { 0x03 } else { 0x02 });
        ret.extend_from_slice(&x_bytes);
        Some(ret)
    }

    /// The x coordinate alone, left-padded to `field_size` bytes.
    pub fn x_bytes(&self, field_size: usize) -> Option<Zeroizing<Vec<u8>>> {
        be_bytes_fixed(&self.x, field_size)
    }
}


/// A point in projective coordinates in Montgomery form.
#[derive(Clone, Debug)]
struct MontyProjectivePoint {
    x: BoxedMontyForm,
    y: BoxedMontyForm,
    z: BoxedMontyForm,
}


/// Curve parameters converted into Montgomery form for a sequence of point operations.
#[derive(Clone, Debug)]
struct MontyArithmetic {
    params: BoxedMontyParams,
    a: BoxedMontyForm,
    b: BoxedMontyForm,
    b3: BoxedMontyForm,
}
impl MontyArithmetic {
    fn identity(&self) -> MontyProjectivePoint {
        MontyProjectivePoint {
            x: BoxedMontyForm::zero(self.params.clone()),
            y: BoxedMontyForm::one(self.params.clone()),
            z: BoxedMontyForm::zero(self.params.clone()),
        }
    }

    fn from_affine(&self, point: &AffinePoint) -> MontyProjectivePoint {
        MontyProjectivePoint {
            x: BoxedMontyForm::new(point.x.clone(), self.params.clone()),
            y: BoxedMontyForm::new(point.y.clone(), self.params.clone()),
            z: BoxedMontyForm::one(self.params.clone()),
        }
    }

    /// Converts back into affine coordinates; the point at infinity has none.
    fn to_affine(&self, point: &MontyProjectivePoint) -> Option<AffinePoint> {
        let z_inverse = point.z.invert().into_option()?;
        let x = (&point.x).mul(&z_inverse);
        let y = (&point.y).mul(&z_inverse);
        Some(AffinePoint::new(x.retrieve(), y.retrieve()))
    }

    fn contains(&self, point: &AffinePoint) -> Choice {
        let projective = self.from_affine(point);
        let x = &projective.x;
        let y_squared = (&projective.y).mul(&projective.y);
        let x_cubed = x.mul(x).mul(x);
        let rhs = (&x_cubed).add(&(&self.a).mul(x)).add(&self.b);
        y_squared.retrieve().ct_eq(&rhs.retrieve())
    }

    /// Complete doubling for arbitrary `a`.
    ///
    /// Renes, Costello, Batina: "Complete addition formulas for prime order elliptic curves"
    /// (<https://eprint.iacr.org/2015/1060>), Algorithm 3.
    fn double(&self, point: &MontyProjectivePoint) -> MontyProjectivePoint {
        let mut t0 = (&point.x).mul(&point.x);
        let t1 = (&point.y).mul(&point.y);
        let mut t2 = (&point.z).mul(&point.z);
        let mut t3 = (&point.x).mul(&point.y);
        t3 = (&t3).add(&t3);
        let mut z3 = (&point.x).mul(&point.z);
        z3 = (&z3).add(&z3);
        let mut x3 = (&self.a).mul(&z3);
        let mut y3 = (&self.b3).mul(&t2);
        y3 = (&x3).add(&y3);
        x3 = (&t1).sub(&y3);
        y3 = (&t1).add(&y3);
        y3 = (&x3).mul(&y3);
        x3 = (&t3).mul(&x3);
        z3 = (&self.b3).mul(&z3);
        t2 = (&self.a).mul(&t2);
        t3 = (&t0).sub(&t2);
        t3 = (&self.a).mul(&t3);
        t3 = (&t3).add(&z3);
        z3 = (&t0).add(&t0);
        t0 = (&z3).add(&t0);
        t0 = (&t0).add(&t2);
        t0 = (&t0).mul(&t3);
        y3 = (&y3).add(&t0);
        t2 = (&point.y).mul(&point.z);
        t2 = (&t2).add(&t2);
        t0 = (&t2).mul(&t3);
        x3 = (&x3).sub(&t0);
        z3 = (&t2).mul(&t1);
        z3 = (&z3).add(&z3);
        z3 = (&z3).add(&z3);
        MontyProjectivePoint { x: x3, y: y3, z: z3 }
    }

    /// Complete addition for arbitrary `a`; Algorithm 1 of the same paper.
    fn sum(&self, lhs: &MontyProjectivePoint, rhs: &MontyProjectivePoint) -> MontyProjectivePoint {
        let mut t0 = (&lhs.x).mul(&rhs.x);
        let mut t1 = (&lhs.y).mul(&rhs.y);
        let mut t2 = (&lhs.z).mul(&rhs.z);
        let mut t3 = (&lhs.x).add(&lhs.y);
        let mut t4 = (&rhs.x).add(&rhs.y);
        t3 = (&t3).mul(&t4);
        t4 = (&t0).add(&t1);
        t3 = (&t3).sub(&t4);
        t4 = (&lhs.x).add(&lhs.z);
        let mut t5 = (&rhs.x).add(&rhs.z);
        t4 = (&t4).mul(&t5);
        t5 = (&t0).add(&t2);
        t4 = (&t4).sub(&t5);
        t5 = (&lhs.y).add(&lhs.z);
        let mut x3 = (&rhs.y).add(&rhs.z);
        t5 = (&t5).mul(&x3);
        x3 = (&t1).add(&t2);
        t5 = (&t5).sub(&x3);
        let mut z3 = (&self.a).mul(&t4);
        x3 = (&self.b3).mul(&t2);
        z3 = (&x3).add(&z3);
        x3 = (&t1).sub(&z3);
        z3 = (&t1).add(&z3);
        let mut y3 = (&x3).mul(&z3);
        t1 = (&t0).add(&t0);
        t1 = (&t1).add(&t0);
        t2 = (&self.a).mul(&t2);
        t4 = (&self.b3).mul(&t4);
        t1 = (&t1).add(&t2);
        t2 = (&t0).sub(&t2);
        t2 = (&self.a).mul(&t2);
        t4 = (&t4).add(&t2);
        t0 = (&t1).mul(&t4);
        y3 = (&y3).add(&t0);
        t0 = (&t5).mul(&t4);
        x3 = (&t3).mul(&x3);
        x3 = (&x3).sub(&t0);
        t0 = (&t3).mul(&t1);
        z3 = (&t5).mul(&z3);
        z3 = (&z3).add(&t0);
        MontyProjectivePoint { x: x3, y: y3, z: z3 }
    }

    fn multiply(&self, scalar: &BoxedUint, point: &MontyProjectivePoint) -> MontyProjectivePoint {
        let mut result = self.identity();
        let mut addend = point.clone();
        for i in 0..scalar.bits() {
            // always compute the sum so the operation sequence does not depend on the scalar bits
            let sum = self.sum(&result, &addend);
            if bool::from(scalar.bit(i)) {
                result = sum;
            }
            addend = self.double(&addend);
        }
        result
    }
}


/// An elliptic curve of the form `y**2 ≡ x**3 + ax + b` modulo a prime number.
#[derive(Clone, Debug, Eq, PartialEq, ZeroizeOnDrop)]
pub struct PrimeWeierstrassCurve {
    prime: BoxedUint,
    coefficient_a: BoxedUint,
    coefficient_b: BoxedUint,
    generator: AffinePoint,

    /// The order of the subgroup generated by the generator.
    order: BoxedUint,

    /// The number of points on the curve divided by the order of the generator.
    cofactor: u8,
}
impl PrimeWeierstrassCurve {
    /// Assembles a curve from big-endian encoded parameters.
    ///
    /// Returns `None` if the field elements differ in length, the prime is even, the cofactor is
    /// zero or the generator is not a point on the curve.
    pub fn from_be_slices(
        prime: &[u8],
        coefficient_a: &[u8],
        coefficient_b: &[u8],
        generator_x: &[u8],
        generator_y: &[u8],
        order: &[u8],
        cofactor: u8,
    ) -> Option<Self> {
        let field_size = prime.len();
        let all_field_sized = [coefficient_a, coefficient_b, generator_x, generator_y].iter()
            .all(|element| element.len() == field_size);
        if field_size == 0 || !all_field_sized || order.is_empty() || cofactor == 0 {
            return None;
        }

        let prime = boxed_uint_from_be_slice(prime);
        if !bool::from(prime.is_odd()) {
            return None;
        }

        let curve = Self {
            prime,
            coefficient_a: boxed_uint_from_be_slice(coefficient_a),
            coefficient_b: boxed_uint_from_be_slice(coefficient_b),
            generator: AffinePoint::new(
                boxed_uint_from_be_slice(generator_x),
                boxed_uint_from_be_slice(generator_y),
            ),
            order: boxed_uint_from_be_slice(order),
            cofactor,
        };
        if !curve.is_valid_point(&curve.generator) {
            return None;
        }
        Some(curve)
    }

    pub fn prime(&self) -> &BoxedUint { &self.prime }
    pub fn coefficient_a(&self) -> &BoxedUint { &self.coefficient_a }
    pub fn coefficient_b(&self) -> &BoxedUint { &self.coefficient_b }
    pub fn generator(&self) -> &AffinePoint { &self.generator }
    pub fn order(&self) -> &BoxedUint { &self.order }
    pub fn cofactor(&self) -> u8 { self.cofactor }

    /// The number of bytes required to encode a field element (one coordinate).
    pub fn field_size_bytes(&self) -> usize {
        usize::try_from(self.prime.bits().div_ceil(8))
            .expect("field size fits into usize")
    }

    fn arithmetic(&self) -> MontyArithmetic {
        let modulus = self.prime.to_odd()
            .into_option()
            .expect("prime checked to be odd on construction");
        let params = BoxedMontyParams::new(modulus);
        let a = BoxedMontyForm::new(self.coefficient_a.clone(), params.clone());
        let b = BoxedMontyForm::new(self.coefficient_b.clone(), params.clone());
        let b3 = (&b).add(&b).add(&b);
        MontyArithmetic { params, a, b, b3 }
    }

    pub fn is_on_curve_affine(&self, point: &AffinePoint) -> Choice {
        self.arithmetic().contains(point)
    }

    /// Whether both coordinates are reduced modulo the prime and the point lies on the curve.
    pub fn is_valid_point(&self, point: &AffinePoint) -> bool {
        point.x < self.prime
            && point.y < self.prime
            && bool::from(self.is_on_curve_affine(point))
    }

    /// Decodes a point in uncompressed encoding (`04 || X || Y`).
    ///
    /// Returns `None` unless each coordinate is exactly one field element long and the point is
    /// valid on this curve.
    pub fn decode_point(&self, bytes: &[u8]) -> Option<AffinePoint> {
        let field_size = self.field_size_bytes();
        if bytes.len() != 1 + 2*field_size || bytes[0] != 0x04 {
            return None;
        }
        let point = AffinePoint::new(
            boxed_uint_from_be_slice(&bytes[1..1+field_size]),
            boxed_uint_from_be_slice(&bytes[1+field_size..]),
        );
        if !self.is_valid_point(&point) {
            return None;
        }
        Some(point)
    }

    /// Encodes a point in uncompressed encoding with coordinates of the curve's field size.
    pub fn encode_point(&self, point: &AffinePoint) -> Option<Zeroizing<Vec<u8>>> {
        point.to_uncompressed_bytes(self.field_size_bytes())
    }

    /// Generates a private key uniformly distributed in `[1, order)`.
    pub fn generate_private_key<R: RngCore + CryptoRng>(&self, rng: &mut R) -> BoxedUint {
        let order_bits = self.order.bits();
        let key_length = usize::try_from(order_bits.div_ceil(8))
            .expect("key length fits into usize");
        let excess_bits = key_length * 8 - usize::try_from(order_bits).expect("bit count fits into usize");
        let top_byte_mask = 0xFFu8 >> excess_bits;

        loop {
            let mut bytes = Zeroizing::new(vec![0u8; key_length]);
            rng.fill_bytes(&mut bytes);
            bytes[0] &= top_byte_mask;

            let candidate = boxed_uint_from_be_slice(&bytes);
            if !bool::from(candidate.is_zero()) && candidate < self.order {
                return candidate;
            }
        }
    }

    /// Calculates a public key (`private_key * generator`) from a private key.
    ///
    /// Returns `None` if the product is the point at infinity.
    pub fn calculate_public_key(&self, private_key: &BoxedUint) -> Option<AffinePoint> {
        let arithmetic = self.arithmetic();
        let generator = arithmetic.from_affine(&self.generator);
        let product = arithmetic.multiply(private_key, &generator);
        arithmetic.to_affine(&product)
    }

    /// Multiplies the other party's public key with our private key.
    ///
    /// Returns `None` if the other public key is not a valid point on this curve or if the
    /// product is the point at infinity.
    pub fn diffie_hellman(&self, private_key: &BoxedUint, other_public_key: &AffinePoint) -> Option<AffinePoint> {
        if !self.is_valid_point(other_public_key) {
            return None;
        }
        let arithmetic = self.arithmetic();
        let other_public = arithmetic.from_affine(other_public_key);
        let product = arithmetic.multiply(private_key, &other_public);
        arithmetic.to_affine(&product)
    }

    /// Derives the curve used for the second key agreement of the Generic Mapping.
    ///
    /// The new generator is `nonce * generator + cofactor * shared_point`; all other parameters
    /// remain the same. Returns `None` if the new generator is the point at infinity.
    pub fn derive_generic_mapping_session_curve(&self, nonce: &BoxedUint, shared_point: &AffinePoint) -> Option<Self> {
        let arithmetic = self.arithmetic();
        let generator = arithmetic.from_affine(&self.generator);
        let scaled_generator = arithmetic.multiply(nonce, &generator);

        let mut shared = arithmetic.from_affine(shared_point);
        if self.cofactor != 1 {
            let cofactor = boxed_uint_from_be_slice(&[self.cofactor]);
            shared = arithmetic.multiply(&cofactor, &shared);
        }

        let new_generator = arithmetic.to_affine(&arithmetic.sum(&scaled_generator, &shared))?;
        Some(Self {
            prime: self.prime.clone(),
            coefficient_a: self.coefficient_a.clone(),
            coefficient_b: self.coefficient_b.clone(),
            generator: new_generator,
            order: self.order.clone(),
            cofactor: self.cofactor,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::{AffinePoint, PrimeWeierstrassCurve};
    use super::curves::{curve_for_parameter_id, BRAINPOOL_P256R1};
    use crate::crypt::boxed_uint_from_be_slice;
    use hex_literal::hex;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn brainpool_p256r1() -> PrimeWeierstrassCurve {
        BRAINPOOL_P256R1.to_curve().unwrap()
    }

    #[test]
    fn icao_doc9303_part11_secg1_example() {
        let curve = brainpool_p256r1();

        let nonce = boxed_uint_from_be_slice(&hex!("3F00C4D3 9D153F2B 2A214A07 8D899B22"));

        // mapping key agreement
        let terminal_private = boxed_uint_from_be_slice(&hex!("
            7F4EF07B 9EA82FD7 8AD689B3 8D0BC78C
            F21F249D 953BC46F 4C6E1925 9C010F99
        "));
        let chip_private = boxed_uint_from_be_slice(&hex!("
            498FF497 56F2DC15 87840041 839A8598
            2BE7761D 14715FB0 91EFA7BC E9058560
        "));

        let terminal_public = curve.calculate_public_key(&terminal_private).unwrap();
        let chip_public = curve.calculate_public_key(&chip_private).unwrap();
        assert_eq!(
            curve.encode_point(&terminal_public).unwrap().as_slice(),
            &hex!("
                04
                7ACF3EFC 982EC455 65A4B155 129EFBC7
                4650DCBF A6362D89 6FC70262 E0C2CC5E
                544552DC B6725218 799115B5 5C9BAA6D
                9F6BC3A9 618E70C2 5AF71777 A9C4922D
            "),
        );
        assert_eq!(
            curve.encode_point(&chip_public).unwrap().as_slice(),
            &hex!("
                04
                824FBA91 C9CBE26B EF53A0EB E7342A3B
                F178CEA9 F45DE0B7 0AA60165 1FBA3F57
                30D8C879 AAA9C9F7 3991E61B 58F4D52E
                B87A0A0C 709A49DC 63719363 CCD13C54
            "),
        );

        let terminal_shared = curve.diffie_hellman(&terminal_private, &chip_public).unwrap();
        let chip_shared = curve.diffie_hellman(&chip_private, &terminal_public).unwrap();
        assert_eq!(terminal_shared, chip_shared);
        assert_eq!(
            curve.encode_point(&terminal_shared).unwrap().as_slice(),
            &hex!("
                04
                60332EF2 450B5D24 7EF6D386 8397D398
                852ED6E8 CAF6FFEE F6BF85CA 57057FD5
                0840CA74 15BAF3E4 3BD414D3 5AA4608B
                93A2CAF3 A4E3EA4E 82C9C13D 03EB7181
            "),
        );

        let session_curve = curve.derive_generic_mapping_session_curve(&nonce, &terminal_shared).unwrap();
        assert_eq!(
            session_curve.encode_point(session_curve.generator()).unwrap().as_slice(),
            &hex!("
                04
                8CED63C9 1426D4F0 EB1435E7 CB1D74A4
                6723A0AF 21C89634 F65A9AE8 7A9265E2
                8C879506 743F8611 AC33645C 5B985C80
                B5F09A0B 83407C1B 6A4D857A E76FE522
            "),
        );

        // session key agreement on the mapped curve
        let session_terminal_private = boxed_uint_from_be_slice(&hex!("
            A73FB703 AC1436A1 8E0CFA5A BB3F7BEC
            7A070E7A 6788486B EE230C4A 22762595
        "));
        let session_chip_private = boxed_uint_from_be_slice(&hex!("
            107CF586 96EF6155 053340FD 633392BA
            81909DF7 B9706F22 6F32086C 7AFF974A
        "));
        let session_terminal_public = session_curve.calculate_public_key(&session_terminal_private).unwrap();
        let session_chip_public = session_curve.calculate_public_key(&session_chip_private).unwrap();
        assert_eq!(
            session_curve.encode_point(&session_terminal_public).unwrap().as_slice(),
            &hex!("
                04
                2DB7A64C 0355044E C9DF1905 14C625CB
                A2CEA487 54887122 F3A5EF0D 5EDD301C
                3556F3B3 B186DF10 B857B58F 6A7EB80F
                20BA5DC7 BE1D43D9 BF850149 FBB36462
            "),
        );
        assert_eq!(
            session_chip_public.to_compressed_bytes(32).unwrap().as_slice(),
            &hex!("
                02
                9E880F84 2905B8B3 181F7AF7 CAA9F0EF
                B743847F 44A306D2 D28C1D9E C65DF6DB
            "),
        );

        let session_terminal_shared = session_curve.diffie_hellman(&session_terminal_private, &session_chip_public).unwrap();
        let session_chip_shared = session_curve.diffie_hellman(&session_chip_private, &session_terminal_public).unwrap();
        assert_eq!(session_terminal_shared, session_chip_shared);
        assert_eq!(
            session_terminal_shared.x_bytes(32).unwrap().as_slice(),
            &hex!("
                28768D20 701247DA E81804C9 E780EDE5
                82A9996D B4A31502 0B273319 7DB84925
            "),
        );
    }

    #[test]
    fn decode_rejects_malformed_points() {
        let curve = brainpool_p256r1();
        let generator_bytes = curve.encode_point(curve.generator()).unwrap();
        assert_eq!(curve.decode_point(&generator_bytes).as_ref(), Some(curve.generator()));

        // compressed form
        let mut compressed = generator_bytes[..33].to_vec();
        compressed[0] = 0x02;
        assert!(curve.decode_point(&compressed).is_none());

        // wrong length
        assert!(curve.decode_point(&generator_bytes[..64]).is_none());

        // not on the curve
        let mut off_curve = generator_bytes.to_vec();
        off_curve[64] ^= 0x01;
        assert!(curve.decode_point(&off_curve).is_none());

        // coordinates must be field elements
        let mut unreduced = vec![0x04];
        unreduced.extend(BRAINPOOL_P256R1.prime);
        unreduced.extend(BRAINPOOL_P256R1.prime);
        assert!(curve.decode_point(&unreduced).is_none());
    }

    #[test]
    fn diffie_hellman_rejects_invalid_point() {
        let curve = brainpool_p256r1();
        let bogus = AffinePoint::new(
            boxed_uint_from_be_slice(&[0x01; 32]),
            boxed_uint_from_be_slice(&[0x02; 32]),
        );
        assert!(curve.diffie_hellman(&boxed_uint_from_be_slice(&[0x05]), &bogus).is_none());
    }

    #[test]
    fn generated_keys_agree() {
        let mut rng = StdRng::seed_from_u64(0x5041_4345);
        for parameter_id in [10, 12, 18] {
            let curve = curve_for_parameter_id(parameter_id).unwrap();
            let first_private = curve.generate_private_key(&mut rng);
            let second_private = curve.generate_private_key(&mut rng);
            assert!(first_private < *curve.order());
            assert_ne!(first_private, second_private);

            let first_public = curve.calculate_public_key(&first_private).unwrap();
            let second_public = curve.calculate_public_key(&second_private).unwrap();
            let encoded = curve.encode_point(&first_public).unwrap();
            assert_eq!(encoded.len(), 1 + 2*curve.field_size_bytes());
            assert_eq!(curve.decode_point(&encoded).as_ref(), Some(&first_public));

            assert_eq!(
                curve.diffie_hellman(&first_private, &second_public),
                curve.diffie_hellman(&second_private, &first_public),
            );
        }
    }
}
