//! The class byte (CLA) of a command APDU.
//!
//! Specified in ISO/IEC 7816-4:2020 § 5.4.1.


/// The Secure Messaging indication carried in the class byte.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SmIndication {
    #[default]
    None,
    Proprietary,
    /// Secure Messaging, command header not processed.
    WithoutHeader,
    /// Secure Messaging, command header authenticated.
    WithHeader,
}


/// A decoded class byte.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ClassByte {
    /// Interindustry class (first interindustry values for channels 0 to 3, further interindustry
    /// values for channels 4 to 19).
    Interindustry {
        channel: u8,
        secure_messaging: SmIndication,
        chaining: bool,
    },
    Proprietary(u8),
}
impl ClassByte {
    /// Decodes a class byte. Returns `None` for the reserved values `001x xxxx` and `FF`.
    pub const fn parse(cla: u8) -> Option<Self> {
        if cla == 0xFF {
            return None;
        }
        if cla & 0b1000_0000 != 0 {
            return Some(Self::Proprietary(cla));
        }
        let chaining = cla & 0b0001_0000 != 0;
        match cla & 0b1110_0000 {
            0b0000_0000 => {
                // 000x yyzz: x = chaining, yy = SM, zz = channel
                let secure_messaging = match (cla >> 2) & 0b11 {
                    0b00 => SmIndication::None,
                    0b01 => SmIndication::Proprietary,
                    0b10 => SmIndication::WithoutHeader,
                    _ => SmIndication::WithHeader,
                };
                Some(Self::Interindustry {
                    channel: cla & 0b11,
                    secure_messaging,
                    chaining,
                })
            },
            0b0100_0000|0b0110_0000 => {
                // 01yx zzzz: y = SM, x = chaining, zzzz = channel - 4
                let secure_messaging = if cla & 0b0010_0000 != 0 {
                    SmIndication::WithoutHeader
                } else {
                    SmIndication::None
                };
                Some(Self::Interindustry {
                    channel: (cla & 0b1111) + 4,
                    secure_messaging,
                    chaining,
                })
            },
            _ => None,
        }
    }

    /// Encodes the class byte. Returns `None` if the combination cannot be expressed.
    pub const fn to_byte(&self) -> Option<u8> {
        match *self {
            Self::Proprietary(cla) => Some(cla),
            Self::Interindustry { channel, secure_messaging, chaining } => {
                let chaining_bit = if chaining { 0b0001_0000 } else { 0 };
                if channel < 4 {
                    let sm_bits = match secure_messaging {
                        SmIndication::None => 0b00,
                        SmIndication::Proprietary => 0b01,
                        SmIndication::WithoutHeader => 0b10,
                        SmIndication::WithHeader => 0b11,
                    };
                    Some(chaining_bit | (sm_bits << 2) | channel)
                } else if channel < 20 {
                    let sm_bit = match secure_messaging {
                        SmIndication::None => 0,
                        SmIndication::WithoutHeader => 0b0010_0000,
                        SmIndication::Proprietary|SmIndication::WithHeader => return None,
                    };
                    Some(0b0100_0000 | sm_bit | chaining_bit | (channel - 4))
                } else {
                    None
                }
            },
        }
    }

    pub const fn secure_messaging(&self) -> SmIndication {
        match self {
            Self::Proprietary(_) => SmIndication::None,
            Self::Interindustry { secure_messaging, .. } => *secure_messaging,
        }
    }

    pub const fn channel(&self) -> Option<u8> {
        match self {
            Self::Proprietary(_) => None,
            Self::Interindustry { channel, .. } => Some(*channel),
        }
    }

    pub const fn is_chained(&self) -> bool {
        match self {
            Self::Proprietary(_) => false,
            Self::Interindustry { chaining, .. } => *chaining,
        }
    }

    /// Returns the same class with the given Secure Messaging indication, or `None` for proprietary
    /// classes and for indications that cannot be expressed on the channel.
    pub const fn with_secure_messaging(&self, indication: SmIndication) -> Option<Self> {
        match *self {
            Self::Proprietary(_) => None,
            Self::Interindustry { channel, chaining, .. } => {
                let updated = Self::Interindustry { channel, secure_messaging: indication, chaining };
                if updated.to_byte().is_some() {
                    Some(updated)
                } else {
                    None
                }
            },
        }
    }
}
