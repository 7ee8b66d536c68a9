//! Random secret generation for bearer tokens and OAuth state values.

use crate::error::AppError;
use base64::Engine as _;
use serde_json::json;

/// Random bytes behind each access or refresh token.
pub const TOKEN_BYTES: usize = 50;

/// Random bytes behind an OAuth `state` value.
pub const STATE_BYTES: usize = 24;

/// Generates `len` bytes from the OS RNG, encoded as URL-safe base64 without
/// padding.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the system random number generator fails.
pub fn random_secret(len: usize) -> Result<String, AppError> {
    let mut buffer = vec![0u8; len];

    getrandom::fill(&mut buffer).map_err(|e| {
        AppError::internal("Failed to generate random bytes", json!({ "reason": e.to_string() }))
    })?;

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer))
}
