//! Block padding used by the web client's AES stage. Two schemes live here and
//! they are not interchangeable: PKCS#7 pads the plaintext, zero padding only
//! ever touches key and IV strings.

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Pads `data` to a multiple of `block_size` with PKCS#7 bytes. A full block
/// of padding is added when the input is already aligned, so the output is
/// always strictly longer than the input.
pub fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - data.len() % block_size;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Appends `\0` bytes until the length reaches the next 16-byte boundary.
/// Aligned input, including the empty string, is returned unchanged.
pub fn zero_pad(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    while bytes.len() % BLOCK_SIZE != 0 {
        bytes.push(0);
    }
    bytes
}
