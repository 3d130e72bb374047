//! Request builder for the web client's `weapi` endpoints.
//!
//! A request body is two fields: `params`, the payload encrypted twice with
//! AES-128-CBC (first with a static key shipped in the client, then with a
//! random per-session nonce), and `encSecKey`, the nonce run through a
//! textbook RSA transform so the server can recover it. Every constant must
//! match the client byte-for-byte or the server rejects the request.

use num_bigint::BigUint;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::key_exchange::{encode_key_exchange, parse_hex};
use super::symmetric::symmetric_encrypt;
use super::CipherError;

pub const CLIENT_IV: &str = "0102030405060708";
pub const STATIC_KEY: &str = "0CoJUm6Qyw8W8jud";
pub const PUBLIC_EXPONENT_HEX: &str = "010001";
pub const PUBLIC_MODULUS_HEX: &str = "00e0b509f6259df8642dbc35662901477df22677ec152b5ff68ace615bb7b725152b3ab17a876aea8a5aa76d2e417629ec4ee341f56135fccf695280104e0312ecbda92557c93870114af6c9d05c4f7f0c3685b7a46bee255932575cce10b424d813cfe4875d3e82047b97ddef52741d546b8e289dc6935b3ece0462db0a22b8e7";

/// Length of the per-session nonce.
pub const NONCE_LEN: usize = 16;

const MAX_MODULUS_BITS: u64 = 1024;

/// Fixed values embedded in the web client. They are public, not secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherConstants {
    pub iv: String,
    pub static_key: String,
    pub public_exponent_hex: String,
    pub modulus_hex: String,
}

impl Default for CipherConstants {
    fn default() -> Self {
        Self {
            iv: CLIENT_IV.to_string(),
            static_key: STATIC_KEY.to_string(),
            public_exponent_hex: PUBLIC_EXPONENT_HEX.to_string(),
            modulus_hex: PUBLIC_MODULUS_HEX.to_string(),
        }
    }
}

/// The only shape ever sent to a `weapi` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRequest {
    pub params: String,
    #[serde(rename = "encSecKey")]
    pub enc_sec_key: String,
}

impl EncryptedRequest {
    /// Field pairs for a form-encoded POST body.
    pub fn form_fields(&self) -> [(&str, &str); 2] {
        [("params", self.params.as_str()), ("encSecKey", self.enc_sec_key.as_str())]
    }
}

/// Draws a 16-character nonce uniformly from `[A-Za-z0-9]`.
pub fn generate_nonce() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// Holds the constants and one nonce for the lifetime of a run. Every request
/// built by the same instance shares the nonce and therefore the `encSecKey`.
pub struct WeapiCipher {
    constants: CipherConstants,
    exponent: BigUint,
    modulus: BigUint,
    nonce: String,
}

impl WeapiCipher {
    /// Builds a cipher with a freshly generated nonce.
    pub fn new(constants: CipherConstants) -> Result<Self, CipherError> {
        Self::with_nonce(constants, generate_nonce())
    }

    /// Builds a cipher around a caller-chosen nonce.
    pub fn with_nonce(constants: CipherConstants, nonce: String) -> Result<Self, CipherError> {
        let exponent = parse_hex("public exponent", &constants.public_exponent_hex)?;
        let modulus = parse_hex("modulus", &constants.modulus_hex)?;
        if modulus.bits() == 0 || modulus.bits() > MAX_MODULUS_BITS {
            return Err(CipherError::InvalidConstant(format!(
                "modulus must be 1..={MAX_MODULUS_BITS} bits, got {}",
                modulus.bits()
            )));
        }
        if constants.iv.len() > 16 || constants.static_key.len() > 16 || nonce.len() > 16 {
            return Err(CipherError::InvalidConstant(
                "iv, static key and nonce must fit in one AES block".to_string(),
            ));
        }
        Ok(Self {
            constants,
            exponent,
            modulus,
            nonce,
        })
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Encrypts `plaintext` under the static key and then under the nonce.
    /// Newlines survive in the result; callers strip them.
    pub fn double_encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let inner = symmetric_encrypt(plaintext, &self.constants.static_key, &self.constants.iv)?;
        symmetric_encrypt(&inner, &self.nonce, &self.constants.iv)
    }

    /// The `encSecKey` value for this instance's nonce.
    pub fn key_exchange_value(&self) -> Result<String, CipherError> {
        encode_key_exchange(&self.nonce, &self.exponent, &self.modulus)
    }

    /// Serializes `payload` as compact JSON and wraps it into a request body.
    pub fn build_encrypted_request<T: Serialize>(
        &self,
        payload: &T,
    ) -> Result<EncryptedRequest, CipherError> {
        let json = serde_json::to_string(payload)
            .map_err(|e| CipherError::EncryptionFailed(format!("payload encoding: {e}")))?;
        let params = self.double_encrypt(&json)?.replace('\n', "");
        Ok(EncryptedRequest {
            params,
            enc_sec_key: self.key_exchange_value()?,
        })
    }
}

impl std::fmt::Debug for WeapiCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeapiCipher")
            .field("constants", &self.constants)
            .field("nonce", &"<redacted>")
            .finish()
    }
}

impl Drop for WeapiCipher {
    fn drop(&mut self) {
        // The nonce doubles as a symmetric key.
        self.nonce.zeroize();
    }
}
