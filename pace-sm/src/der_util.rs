//! Utility functions for Basic and Distinguished Encoding Rules.


use rasn::types::Oid;


/// Encode an ASN.1 DER primitive value length.
pub fn encode_primitive_length(output: &mut Vec<u8>, length: usize) {
    if length < 128 {
        // single-byte encoding
        output.push(length as u8);
    } else {
        // 0b1nnn_nnnn and then n additional bytes that actually specify the length
        // (big-endian)
        let length_bytes = length.to_be_bytes();
        let first_nonzero = length_bytes.iter()
            .position(|b| *b != 0x00)
            .unwrap_or(length_bytes.len() - 1);
        let trimmed_length_slice = &length_bytes[first_nonzero..];
        output.push(0b1000_0000 | (trimmed_length_slice.len() as u8));
        output.extend(trimmed_length_slice);
    }
}


/// Decode an ASN.1 DER primitive value length.
///
/// The length must be at the beginning of the input slice.
///
/// Returns a tuple `(length, rest)` where `rest` is the rest of the input slice once the length has
/// been removed.
pub fn try_decode_primitive_length(input: &[u8]) -> Option<(usize, &[u8])> {
    let (&start_byte, rest) = input.split_first()?;
    let start_lower_bits = start_byte & 0b0111_1111;
    if start_byte & 0b1000_0000 == 0 {
        return Some((start_lower_bits.into(), rest));
    }

    // multiple bytes
    let length_byte_count: usize = start_lower_bits.into();
    if length_byte_count == 0 || length_byte_count > rest.len() {
        // indefinite length or truncated
        return None;
    }
    let mut length: usize = 0;
    for length_byte in &rest[..length_byte_count] {
        length = length.checked_mul(256)?
            .checked_add(usize::from(*length_byte))?;
    }
    Some((length, &rest[length_byte_count..]))
}


/// Decode a BER tag, including multi-byte tags such as `7F49`.
///
/// The tag is returned as the big-endian integer of its encoded bytes, i.e. `7F49` is returned as
/// `0x7F49`.
pub fn try_decode_tag(input: &[u8]) -> Option<(u32, &[u8])> {
    let (&first, mut rest) = input.split_first()?;
    let mut tag = u32::from(first);
    if first & 0b0001_1111 != 0b0001_1111 {
        return Some((tag, rest));
    }

    // subsequent bytes follow while the top bit is set
    for encoded_bytes in 2..=4 {
        let (&next, next_rest) = rest.split_first()?;
        rest = next_rest;
        tag = (tag << 8) | u32::from(next);
        if next & 0b1000_0000 == 0 {
            return Some((tag, rest));
        }
        if encoded_bytes == 4 {
            break;
        }
    }
    None
}


/// Encodes a tag value as returned by [`try_decode_tag`].
pub fn encode_tag(output: &mut Vec<u8>, tag: u32) {
    let tag_bytes = tag.to_be_bytes();
    let first_nonzero = tag_bytes.iter()
        .position(|b| *b != 0x00)
        .unwrap_or(tag_bytes.len() - 1);
    output.extend(&tag_bytes[first_nonzero..]);
}


/// Encodes a complete tag-length-value structure.
pub fn encode_tlv(output: &mut Vec<u8>, tag: u32, value: &[u8]) {
    encode_tag(output, tag);
    encode_primitive_length(output, value.len());
    output.extend(value);
}


/// A TLV structure borrowed from a byte buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BorrowedTlv<'d> {
    pub tag: u32,
    pub tag_and_length: &'d [u8],
    pub data: &'d [u8],
}
impl<'d> BorrowedTlv<'d> {
    /// Decodes one TLV structure from the beginning of the slice, returning it and the rest.
    pub fn try_from_slice(input: &'d [u8]) -> Option<(Self, &'d [u8])> {
        let (tag, after_tag) = try_decode_tag(input)?;
        let (data_length, after_length) = try_decode_primitive_length(after_tag)?;
        if data_length > after_length.len() {
            return None;
        }
        let tag_and_length = &input[..input.len() - after_length.len()];
        let (data, rest) = after_length.split_at(data_length);
        Some((Self { tag, tag_and_length, data }, rest))
    }

    /// Whether the constructed bit of the tag is set.
    pub fn is_constructed(&self) -> bool {
        self.tag_and_length[0] & 0b0010_0000 != 0
    }

    /// Appends the complete encoding of this structure to the output.
    pub fn write_to(&self, output: &mut Vec<u8>) {
        output.extend(self.tag_and_length);
        output.extend(self.data);
    }
}


/// Decodes a sequence of concatenated TLV structures that must span the whole input.
pub fn parse_tlvs(mut input: &[u8]) -> Option<Vec<BorrowedTlv<'_>>> {
    let mut tlvs = Vec::new();
    while !input.is_empty() {
        let (tlv, rest) = BorrowedTlv::try_from_slice(input)?;
        tlvs.push(tlv);
        input = rest;
    }
    Some(tlvs)
}


/// Encode an object identifier value into bytes using DER encoding rules.
///
/// No tag or length is encoded, only the actual value.
pub fn oid_to_der_bytes(oid: &Oid) -> Vec<u8> {
    const SEVEN_BIT_MASK: u32 = 0b0111_1111;
    const TOP_BIT: u8 = 0b1000_0000;

    fn encode_arc(ret: &mut Vec<u8>, arc: u32) {
        // base-128, most significant group first, continuation bit on all but the last
        let mut groups = [0u8; 5];
        let mut count = 0;
        let mut remaining = arc;
        loop {
            groups[count] = (remaining & SEVEN_BIT_MASK) as u8;
            count += 1;
            remaining >>= 7;
            if remaining == 0 {
                break;
            }
        }
        for i in (0..count).rev() {
            let continuation = if i == 0 { 0 } else { TOP_BIT };
            ret.push(groups[i] | continuation);
        }
    }

    let mut ret = Vec::new();
    let arcs: &[u32] = oid;
    match arcs {
        [] => {},
        [only] => encode_arc(&mut ret, 40*only),
        [first, second, rest @ ..] => {
            encode_arc(&mut ret, 40*first + second);
            for arc in rest {
                encode_arc(&mut ret, *arc);
            }
        },
    }
    ret
}


#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn length_encoding() {
        let mut buf = Vec::new();
        encode_primitive_length(&mut buf, 0x7F);
        encode_primitive_length(&mut buf, 0x80);
        encode_primitive_length(&mut buf, 0x0123);
        assert_eq!(buf, hex!("7F 8180 820123"));

        assert_eq!(try_decode_primitive_length(&hex!("8180 AA")), Some((0x80, &hex!("AA")[..])));
        assert_eq!(try_decode_primitive_length(&hex!("820123")), Some((0x0123, &[][..])));
        assert_eq!(try_decode_primitive_length(&hex!("80")), None);
        assert_eq!(try_decode_primitive_length(&hex!("8201")), None);
    }

    #[test]
    fn multi_byte_tags() {
        let encoded = hex!("7F4903 060100 86 02 0404");
        let tlvs = parse_tlvs(&encoded).unwrap();
        assert_eq!(tlvs.len(), 2);
        assert_eq!(tlvs[0].tag, 0x7F49);
        assert!(tlvs[0].is_constructed());
        assert_eq!(tlvs[0].data, &hex!("060100"));
        assert_eq!(tlvs[1].tag, 0x86);
        assert_eq!(tlvs[1].data, &hex!("0404"));

        let mut reencoded = Vec::new();
        encode_tlv(&mut reencoded, 0x7F49, &hex!("060100"));
        assert_eq!(reencoded, hex!("7F4903 060100"));
    }

    #[test]
    fn truncated_tlv_rejected() {
        assert!(parse_tlvs(&hex!("8705 0102")).is_none());
        assert!(parse_tlvs(&hex!("7F")).is_none());
    }

    #[test]
    fn pace_oid() {
        let oid = Oid::new(&[0, 4, 0, 127, 0, 7, 2, 2, 4, 2, 2]).unwrap();
        assert_eq!(oid_to_der_bytes(oid), hex!("04007F00070202040202"));
    }
}
