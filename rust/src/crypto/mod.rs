//! Request encryption used by the partner program's web client. Padding, the
//! AES stage and the RSA-style key exchange sit in their own submodules;
//! `weapi` ties them into a request body.

use thiserror::Error;

pub mod key_exchange;
pub mod padding;
pub mod symmetric;
pub mod weapi;

pub use weapi::{CipherConstants, EncryptedRequest, WeapiCipher};

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("invalid cipher constant: {0}")]
    InvalidConstant(String),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}
