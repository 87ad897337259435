//! ## [Cyclic Encoding](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/9979fc01-0a3e-496f-900f-a6a867951f23)
//!
//! The same transform both encodes and decodes; the key is the low `DWORD` of the block id.

use super::*;

pub fn encode_decode_block(data: &mut [u8], key: u32) {
    let r_table = key_data_r();
    let s_table = key_data_s();
    let i_table = key_data_i();

    let mut key = (key ^ (key >> 16)) as u16;

    for b in data.iter_mut() {
        let [low_key, high_key] = key.to_le_bytes();

        let mut value = b.wrapping_add(low_key);
        value = r_table[usize::from(value)];
        value = value.wrapping_add(high_key);
        value = s_table[usize::from(value)];
        value = value.wrapping_sub(high_key);
        value = i_table[usize::from(value)];
        *b = value.wrapping_sub(low_key);

        key = key.wrapping_add(1);
    }
}
