//! Password Authenticated Connection Establishment (PACE) with Generic Mapping over elliptic
//! curves, followed by ISO/IEC 7816-4 Secure Messaging.


pub mod crypt;
pub mod der_util;
pub mod iso7816;
pub mod pace;
pub mod secure_messaging;


use std::fmt::Write;


/// Formats a buffer as a classic hex dump (offset, hex bytes, printable ASCII).
pub fn hexdump(buf: &[u8]) -> String {
    let mut ret = String::new();
    for (line_index, line) in buf.chunks(16).enumerate() {
        let _ = write!(ret, "{:08X}  ", line_index * 16);

        for i in 0..16 {
            match line.get(i) {
                Some(b) => { let _ = write!(ret, " {:02X}", b); },
                None => ret.push_str("   "),
            }
        }

        ret.push_str(" |");
        for &b in line {
            if (b' '..=b'~').contains(&b) {
                ret.push(char::from(b));
            } else {
                ret.push('.');
            }
        }
        ret.push_str("|\n");
    }
    ret
}


#[cfg(test)]
mod tests {
    use super::hexdump;

    #[test]
    fn hexdump_lines() {
        let dump = hexdump(b"0123456789ABCDEF\x00\x7F");
        assert_eq!(
            dump,
            concat!(
                "00000000   30 31 32 33 34 35 36 37 38 39 41 42 43 44 45 46 |0123456789ABCDEF|\n",
                "00000010   00 7F                                           |..|\n",
            ),
        );
    }
}
