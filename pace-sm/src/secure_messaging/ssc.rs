//! The Send Sequence Counter.


use zeroize_derive::ZeroizeOnDrop;

use crate::secure_messaging::Error;


/// The width of the encoded counter; equal to the AES block size.
pub const SSC_LENGTH: usize = 16;


/// A Send Sequence Counter owned by one Secure Messaging stage.
///
/// The terminal and the card each increment the counter once per APDU they send, so a command is
/// protected under an odd value and its response under the following even value.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, ZeroizeOnDrop)]
pub struct SendSequenceCounter {
    value: u128,
}
impl SendSequenceCounter {
    pub const fn new(value: u128) -> Self {
        Self { value }
    }

    pub const fn value(&self) -> u128 { self.value }

    /// The current value, encoded big-endian.
    pub const fn to_bytes(&self) -> [u8; SSC_LENGTH] {
        self.value.to_be_bytes()
    }

    /// Returns the value under which the next command is protected and advances the counter past
    /// it, to the value the matching response is protected under.
    pub fn advance_for_command(&mut self) -> Result<[u8; SSC_LENGTH], Error> {
        let command_value = self.value.checked_add(1)
            .ok_or(Error::CounterOverflow)?;
        let response_value = command_value.checked_add(1)
            .ok_or(Error::CounterOverflow)?;
        self.value = response_value;
        Ok(command_value.to_be_bytes())
    }

    /// Returns the value under which the current response is protected.
    pub const fn for_response(&self) -> [u8; SSC_LENGTH] {
        self.to_bytes()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn command_response_sequence() {
        let mut ssc = SendSequenceCounter::default();
        assert_eq!(ssc.for_response(), [0u8; 16]);

        assert_eq!(ssc.advance_for_command().unwrap(), hex!("00000000000000000000000000000001"));
        assert_eq!(ssc.for_response(), hex!("00000000000000000000000000000002"));
        // responses do not advance
        assert_eq!(ssc.for_response(), hex!("00000000000000000000000000000002"));

        assert_eq!(ssc.advance_for_command().unwrap(), hex!("00000000000000000000000000000003"));
        assert_eq!(ssc.value(), 4);
    }

    #[test]
    fn cycles_count_twice() {
        let mut ssc = SendSequenceCounter::default();
        for _ in 0..10 {
            ssc.advance_for_command().unwrap();
            ssc.for_response();
        }
        assert_eq!(ssc.value(), 20);
    }

    #[test]
    fn overflow() {
        let mut ssc = SendSequenceCounter::new(u128::MAX - 1);
        assert!(matches!(ssc.advance_for_command(), Err(Error::CounterOverflow)));
        assert_eq!(ssc.value(), u128::MAX - 1);

        let mut ssc = SendSequenceCounter::new(u128::MAX - 2);
        assert_eq!(ssc.advance_for_command().unwrap(), hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFE"));
        assert_eq!(ssc.value(), u128::MAX);
    }
}
