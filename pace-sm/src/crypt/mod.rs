//! Cryptographic functionality.


pub mod cipher_mac;
pub mod elliptic;
pub mod padding;


use std::fmt;

use crypto_bigint::BoxedUint;
use zeroize::Zeroizing;


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Error {
    KeyLength { obtained: usize },
    IvLength { obtained: usize },
    BlockAlignment { block_size: usize, length: usize },
    InvalidPadding,
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyLength { obtained }
                => write!(f, "key of length {} is not valid for the cipher", obtained),
            Self::IvLength { obtained }
                => write!(f, "IV of length {} is not valid for the cipher", obtained),
            Self::BlockAlignment { block_size, length }
                => write!(f, "data length {} is not a multiple of the block size {}", length, block_size),
            Self::InvalidPadding
                => write!(f, "invalid padding"),
        }
    }
}
impl std::error::Error for Error {
}


/// Decodes an unsigned big-endian integer whose precision is exactly the width of the slice.
pub fn boxed_uint_from_be_slice(slice: &[u8]) -> BoxedUint {
    if slice.is_empty() {
        return BoxedUint::zero();
    }
    let bits = u32::try_from(8 * slice.len())
        .expect("slice length fits into u32 bits");
    BoxedUint::from_be_slice(slice, bits)
        .expect("slice fits into its own bit width")
}


/// Encodes an unsigned integer as big-endian bytes, left-padded with zeroes to exactly `width`
/// bytes. Returns `None` if the value does not fit.
pub fn be_bytes_fixed(value: &BoxedUint, width: usize) -> Option<Zeroizing<Vec<u8>>> {
    let full = Zeroizing::new(value.to_be_bytes());
    let significant = strip_leading_zeros(&full);
    if significant.len() > width {
        return None;
    }
    let mut ret = Zeroizing::new(vec![0u8; width]);
    ret[width - significant.len()..].copy_from_slice(significant);
    Some(ret)
}


/// Removes leading zero bytes. An all-zero input becomes empty.
pub fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first_nonzero = bytes.iter()
        .position(|b| *b != 0x00)
        .unwrap_or(bytes.len());
    &bytes[first_nonzero..]
}


#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn fixed_width_encoding() {
        // 28-byte values are stored in 32-byte limbs on 64-bit targets
        let value = boxed_uint_from_be_slice(&hex!("00FF"));
        assert_eq!(&*be_bytes_fixed(&value, 28).unwrap(), &[&[0u8; 27][..], &[0xFF][..]].concat());
        assert_eq!(&*be_bytes_fixed(&value, 1).unwrap(), &hex!("FF"));
        assert!(be_bytes_fixed(&boxed_uint_from_be_slice(&hex!("0100")), 1).is_none());
    }

    #[test]
    fn zero_stripping() {
        assert_eq!(strip_leading_zeros(&hex!("0000 0102 00")), &hex!("0102 00"));
        assert_eq!(strip_leading_zeros(&hex!("0000")), &[] as &[u8]);
    }
}
