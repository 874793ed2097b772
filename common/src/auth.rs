// Shared-secret authorization for the processing trigger

use crate::errors::ProcessError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Fixed key used to reduce both secrets to equal-length tags before the
/// constant-time comparison
const COMPARISON_KEY: &[u8] = b"whatgov-cron-secret";

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the trigger's `Authorization` header against the configured secret.
///
/// The comparison is constant-time with respect to the secret's contents.
pub fn verify_cron_secret(header: Option<&str>, expected: &str) -> Result<(), ProcessError> {
    let header =
        header.ok_or_else(|| ProcessError::Authorization("missing authorization header".into()))?;
    let token = bearer_token(header)
        .ok_or_else(|| ProcessError::Authorization("malformed authorization header".into()))?;

    if expected.is_empty() {
        return Err(ProcessError::Authorization(
            "no cron secret configured".into(),
        ));
    }

    let expected_tag = tag(expected)?;
    let mut mac = HmacSha256::new_from_slice(COMPARISON_KEY)
        .map_err(|e| ProcessError::Authorization(format!("invalid comparison key: {}", e)))?;
    mac.update(token.as_bytes());

    mac.verify_slice(&expected_tag)
        .map_err(|_| ProcessError::Authorization("invalid cron secret".into()))
}

fn tag(value: &str) -> Result<Vec<u8>, ProcessError> {
    let mut mac = HmacSha256::new_from_slice(COMPARISON_KEY)
        .map_err(|e| ProcessError::Authorization(format!("invalid comparison key: {}", e)))?;
    mac.update(value.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
