//! Textbook RSA transform that lets the server recover the per-session nonce.

use num_bigint::BigUint;

use super::CipherError;

/// Hex digits in the encoded value (1024 bits).
pub const KEY_EXCHANGE_HEX_LEN: usize = 256;

/// Parses a hexadecimal constant into a big integer.
pub fn parse_hex(label: &str, hex: &str) -> Result<BigUint, CipherError> {
    BigUint::parse_bytes(hex.as_bytes(), 16)
        .ok_or_else(|| CipherError::InvalidConstant(format!("{label} is not valid hex")))
}

/// Reverses `nonce`, reads its UTF-8 bytes as a big-endian integer and raises
/// it to `exponent` modulo `modulus`. The result is lowercase hex, left-padded
/// with zeros to 256 digits.
pub fn encode_key_exchange(
    nonce: &str,
    exponent: &BigUint,
    modulus: &BigUint,
) -> Result<String, CipherError> {
    if modulus.bits() == 0 {
        return Err(CipherError::EncryptionFailed("modulus is zero".to_string()));
    }
    let reversed: String = nonce.chars().rev().collect();
    let base = BigUint::from_bytes_be(reversed.as_bytes());
    let digits = base.modpow(exponent, modulus).to_str_radix(16);
    if digits.len() > KEY_EXCHANGE_HEX_LEN {
        return Err(CipherError::EncryptionFailed(format!(
            "key exchange value needs {} hex digits",
            digits.len()
        )));
    }
    Ok(format!("{digits:0>width$}", width = KEY_EXCHANGE_HEX_LEN))
}

#[cfg(test)]
mod tests {
    use super::{encode_key_exchange, parse_hex, KEY_EXCHANGE_HEX_LEN};
    use crate::crypto::weapi::{PUBLIC_EXPONENT_HEX, PUBLIC_MODULUS_HEX};
    use num_bigint::BigUint;

    fn constants() -> (BigUint, BigUint) {
        (
            parse_hex("exponent", PUBLIC_EXPONENT_HEX).unwrap(),
            parse_hex("modulus", PUBLIC_MODULUS_HEX).unwrap(),
        )
    }

    #[test]
    fn matches_known_value() {
        let (e, n) = constants();
        let value = encode_key_exchange("aBcDeFgHiJkLmNo1", &e, &n).expect("modpow should succeed");
        assert_eq!(
            value,
            "71d89d95abc65569237cbad01361751c2e684d1f2539ba79aa8b753b0c5690b3\
             c625aab0035943d3a1ff9d2533550579ee5e97f624718e4e1696a1f5152f46ec\
             61623e142e858673b2812f8e27ce28cafaf529ff616d2847f308273073463ba9\
             9456936c92c8f17fcba4e65dd1875445b1bf7bce945540deb6f22b80fb09e697"
        );
    }

    #[test]
    fn pads_short_results_with_zeros() {
        let (e, n) = constants();
        let value = encode_key_exchange("AAAAAAAAAAAAAAAA", &e, &n).unwrap();
        assert_eq!(value.len(), KEY_EXCHANGE_HEX_LEN);
        assert!(value.starts_with("0936"));

        // 2^1 mod 7 is a single digit.
        let tiny = encode_key_exchange("\u{2}", &BigUint::from(1u32), &BigUint::from(7u32)).unwrap();
        assert_eq!(tiny.len(), KEY_EXCHANGE_HEX_LEN);
        assert!(tiny[..255].chars().all(|c| c == '0'));
        assert!(tiny.ends_with('2'));
    }

    #[test]
    fn output_is_lowercase_hex() {
        let (e, n) = constants();
        for nonce in ["zzzzzzzzzzzzzzzz", "0000000000000000", "Zy9Xw8Vu7Ts6Rq5P"] {
            let value = encode_key_exchange(nonce, &e, &n).unwrap();
            assert_eq!(value.len(), KEY_EXCHANGE_HEX_LEN);
            assert!(value.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        }
    }

    #[test]
    fn rejects_bad_constants() {
        assert!(parse_hex("modulus", "not-hex").is_err());
        let err = encode_key_exchange("abc", &BigUint::from(3u32), &BigUint::from(0u32)).unwrap_err();
        assert!(format!("{err}").contains("modulus is zero"));
    }
}
