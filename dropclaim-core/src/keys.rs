//! Public key format checks.
//!
//! Keys are base58 strings encoding 32 bytes, which always renders as 32 to
//! 44 characters. The check is syntactic only.

use crate::error::{ClassifiedError, ErrorKind, Result};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Shortest base58 rendering of 32 bytes.
pub const MIN_KEY_LEN: usize = 32;

/// Longest base58 rendering of 32 bytes.
pub const MAX_KEY_LEN: usize = 44;

/// Check that `key` looks like a base58 public key.
pub fn validate_public_key(key: &str) -> Result<()> {
    if !(MIN_KEY_LEN..=MAX_KEY_LEN).contains(&key.len()) {
        return Err(invalid(key, "length out of range"));
    }
    if let Some(bad) = key.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
        return Err(invalid(key, &format!("character '{}' is not base58", bad)));
    }
    Ok(())
}

/// Whether `key` passes [`validate_public_key`].
pub fn is_valid_public_key(key: &str) -> bool {
    validate_public_key(key).is_ok()
}

fn invalid(key: &str, reason: &str) -> ClassifiedError {
    ClassifiedError::new(
        ErrorKind::InvalidPublicKey,
        format!("Invalid public key: {}", reason),
    )
    .with_context("key", key)
}
