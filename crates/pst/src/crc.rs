//! ## CRC Calculation
//!
//! `dwCRC` values in the PST use the standard reflected CRC-32 polynomial, but start from a
//! caller supplied seed (0 for every structure in the file) and skip the final inversion.

use crc32fast::Hasher;

/// Compute the `dwCRC` of `data`, continuing from `crc`.
pub fn compute_crc(crc: u32, data: &[u8]) -> u32 {
    // crc32fast inverts on the way in and out, so invert around it to get the raw register.
    let mut hasher = Hasher::new_with_initial(!crc);
    hasher.update(data);
    !hasher.finalize()
}
