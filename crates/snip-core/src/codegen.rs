//! Deterministic hash-based short code generation.
//!
//! A code is the base62 encoding of the first 48 bits of
//! `md5(salt ++ original_url)`. Identical inputs always produce identical
//! codes, so a collision is resolved by retrying with a different salt.

use crate::shortcode::ShortCode;
use md5::{Digest, Md5};

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Number of digest bytes folded into the code.
const PREFIX_BYTES: usize = 6;

/// Generates the short code for `original_url`, optionally prefixed by `salt`.
pub fn generate_code(original_url: &str, salt: Option<&str>) -> ShortCode {
    let mut hasher = Md5::new();
    if let Some(salt) = salt {
        hasher.update(salt.as_bytes());
    }
    hasher.update(original_url.as_bytes());
    let digest = hasher.finalize();

    let value = digest[..PREFIX_BYTES]
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));

    ShortCode::new_unchecked(encode_base62(value))
}

/// Encodes `value` in base62 using the `0-9A-Za-z` alphabet, without padding.
pub fn encode_base62(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(11);
    while value > 0 {
        digits.push(BASE62_ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();

    // The alphabet is ASCII, so every byte is a valid char.
    digits.into_iter().map(char::from).collect()
}
