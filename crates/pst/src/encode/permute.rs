//! ## [Permutative Encoding](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/5faf4800-645d-49d1-9457-2ac40eb467bd)

use super::*;

/// Encode block data with `mpbbR`.
#[cfg(test)]
pub fn encode_block(data: &mut [u8]) {
    substitute(data, key_data_r());
}

/// Decode block data with `mpbbI`.
pub fn decode_block(data: &mut [u8]) {
    substitute(data, key_data_i());
}

fn substitute(data: &mut [u8], table: &[u8; 256]) {
    data.iter_mut().for_each(|b| *b = table[usize::from(*b)]);
}
