//! Structures and operations from ISO/IEC 7816-4.


pub mod apdu;
pub mod card;
pub mod class_byte;
pub mod file;
pub mod status;
