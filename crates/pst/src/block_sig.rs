//! ## [Block Signature](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/e700a913-9db5-46a4-ac76-37cabea823e1)

/// Compute the `wSig` stored in a block or page trailer from its byte offset and block id.
///
/// Both inputs are truncated to their low 32 bits first, so the same routine serves the ANSI
/// and Unicode layouts.
pub fn compute_sig(index: u64, block_id: u64) -> u16 {
    let value = (index as u32) ^ (block_id as u32);
    (value >> 16) as u16 ^ (value as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_sig() {
        assert_eq!(compute_sig(0, 0), 0x0000);
        assert_eq!(compute_sig(0x4600, 0x24), 0x4624);
        assert_eq!(compute_sig(0x4624, 0x4624), 0x0000);
    }

    #[test]
    fn test_high_half_folds_in() {
        assert_eq!(compute_sig(0x0001_0000, 0), 0x0001);
        assert_eq!(compute_sig(0x0001_0000, 0x0001_0000), 0x0000);
    }

    #[test]
    fn test_upper_dword_ignored() {
        assert_eq!(
            compute_sig(0xFFFF_0000_0000_4600, 0x24),
            compute_sig(0x4600, 0x24)
        );
    }
}
