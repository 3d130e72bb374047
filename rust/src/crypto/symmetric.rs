//! AES-128-CBC stage of the web client's request encryption.

use aes::Aes128;
use base64::{engine::general_purpose::STANDARD, Engine};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};

use super::padding::{pkcs7_pad, zero_pad, BLOCK_SIZE};
use super::CipherError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;

/// Line length of MIME-style base64 output.
const BASE64_LINE: usize = 76;

/// Encrypts `plaintext` with AES-128-CBC and returns MIME-wrapped base64.
///
/// `key` and `iv` are zero-padded to the block boundary before use and must
/// end up exactly 16 bytes long. The plaintext is PKCS#7 padded. The output
/// carries a newline after every 76 characters and a trailing newline; the
/// request builder strips them from the final layer only.
pub fn symmetric_encrypt(plaintext: &str, key: &str, iv: &str) -> Result<String, CipherError> {
    let key_bytes = zero_pad(key);
    let iv_bytes = zero_pad(iv);
    let encryptor = Aes128CbcEnc::new_from_slices(&key_bytes, &iv_bytes)
        .map_err(|e| CipherError::EncryptionFailed(format!("aes key/iv rejected: {e}")))?;

    let mut buffer = pkcs7_pad(plaintext.as_bytes(), BLOCK_SIZE);
    let len = buffer.len();
    let ciphertext = encryptor
        .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
        .map_err(|e| CipherError::EncryptionFailed(format!("{e}")))?;

    Ok(mime_wrap(&STANDARD.encode(ciphertext)))
}

fn mime_wrap(encoded: &str) -> String {
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE + 1);
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % BASE64_LINE == 0 {
            wrapped.push('\n');
        }
        wrapped.push(c);
    }
    wrapped.push('\n');
    wrapped
}
