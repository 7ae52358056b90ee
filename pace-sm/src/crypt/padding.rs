//! ISO/IEC 7816-4 padding: a mandatory `0x80` followed by zeroes up to the block boundary.


use block_padding::{Iso7816, RawPadding};

use crate::crypt::Error;


/// Pads the data to a multiple of the block size.
///
/// A full block of padding is appended if the data is already block-aligned.
pub fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let padded_length = (data.len() / block_size + 1) * block_size;
    let mut padded = vec![0u8; padded_length];
    padded[..data.len()].copy_from_slice(data);

    let last_block_start = padded_length - block_size;
    Iso7816::raw_pad(&mut padded[last_block_start..], data.len() - last_block_start);
    padded
}


/// Removes the padding from block-aligned data.
pub fn unpad(data: &[u8], block_size: usize) -> Result<&[u8], Error> {
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(Error::BlockAlignment { block_size, length: data.len() });
    }
    let unpadded = Iso7816::raw_unpad(data)
        .map_err(|_| Error::InvalidPadding)?;
    if data.len() - unpadded.len() > block_size {
        // padding never spans more than one block
        return Err(Error::InvalidPadding);
    }
    Ok(unpadded)
}
