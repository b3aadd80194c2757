// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter.
//!
//! Format before encoding: `return_to|timestamp_hex|signature_hex`, where the
//! signature is HMAC-SHA256 over `return_to|timestamp_hex`. The whole string
//! is base64url-encoded without padding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// States older than this are rejected.
pub const STATE_MAX_AGE_SECS: i64 = 15 * 60;

/// Sign `return_to` into an opaque state value.
pub fn sign_state(return_to: &str, secret: &[u8], now_millis: i64) -> anyhow::Result<String> {
    let payload = format!("{}|{:x}", return_to, now_millis);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("HMAC init failed: {}", e))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify a state value and return the embedded `return_to`.
///
/// Returns `None` for malformed, tampered or expired states.
pub fn verify_state(state: &str, secret: &[u8], now_millis: i64) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // The URL itself may contain '|', so split from the right.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let return_to = parts.next()?;

    let payload = format!("{}|{}", return_to, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_millis = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age_millis = now_millis - issued_millis;
    if age_millis < 0 || age_millis > STATE_MAX_AGE_SECS * 1000 {
        tracing::warn!(age_millis, "OAuth state expired");
        return None;
    }

    Some(return_to.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_767_225_600_000;

    #[test]
    fn test_verify_state_success() {
        let secret = b"secret_key";
        let state = sign_state("https://example.com", secret, NOW).unwrap();

        assert_eq!(
            verify_state(&state, secret, NOW + 1000),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn test_verify_state_wrong_secret() {
        let state = sign_state("https://example.com", b"secret_key", NOW).unwrap();
        assert_eq!(verify_state(&state, b"wrong_key", NOW), None);
    }

    #[test]
    fn test_verify_state_invalid_signature() {
        let payload = format!("{}|{:x}", "https://example.com", NOW);
        let forged = URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, "invalid_signature"));
        assert_eq!(verify_state(&forged, b"secret_key", NOW), None);
    }

    #[test]
    fn test_verify_state_expired() {
        let secret = b"secret_key";
        let state = sign_state("https://example.com", secret, NOW).unwrap();
        let later = NOW + (STATE_MAX_AGE_SECS + 1) * 1000;
        assert_eq!(verify_state(&state, secret, later), None);
    }

    #[test]
    fn test_verify_state_malformed() {
        let secret = b"secret_key";
        assert_eq!(verify_state(&URL_SAFE_NO_PAD.encode("invalid"), secret, NOW), None);
        assert_eq!(verify_state("not-valid-base64!!!", secret, NOW), None);
    }

    #[test]
    fn test_return_to_with_pipe_survives() {
        let secret = b"secret_key";
        let state = sign_state("https://example.com/?a=1|2", secret, NOW).unwrap();
        assert_eq!(
            verify_state(&state, secret, NOW),
            Some("https://example.com/?a=1|2".to_string())
        );
    }
}
