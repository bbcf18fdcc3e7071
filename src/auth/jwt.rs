//! JWT expiry inspection.
//!
//! The client never verifies signatures (the backend is the authority); it
//! only reads `exp` to avoid sending a token it already knows is dead.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};

use crate::error::SessionError;

/// Tokens this close to expiry are treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 30;

/// `exp` claim of a JWT, `None` when the token carries no expiry.
pub fn expires_at(token: &str) -> Result<Option<DateTime<Utc>>, SessionError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| SessionError::MalformedToken("expected three segments".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::MalformedToken(format!("payload is not base64url: {}", e)))?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| SessionError::MalformedToken(format!("payload is not JSON: {}", e)))?;

    match claims.get("exp") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(exp) => {
            let secs = exp
                .as_i64()
                .or_else(|| exp.as_f64().map(|f| f as i64))
                .ok_or_else(|| SessionError::MalformedToken("exp is not numeric".to_string()))?;
            DateTime::from_timestamp(secs, 0)
                .map(Some)
                .ok_or_else(|| SessionError::MalformedToken("exp out of range".to_string()))
        }
    }
}

/// Expired or unreadable tokens both count as expired.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match expires_at(token) {
        Ok(Some(exp)) => exp
            .checked_sub_signed(Duration::seconds(EXPIRY_SKEW_SECS))
            .map_or(true, |deadline| deadline <= now),
        Ok(None) => false,
        Err(_) => true,
    }
}

#[cfg(test)]
pub(crate) fn token_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u1","exp":{}}}"#, exp));
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_exp_claim() {
        let token = token_with_exp(1_700_000_000);
        let exp = expires_at(&token).unwrap().unwrap();
        assert_eq!(exp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_expiry_with_skew() {
        let now = Utc::now();
        let fresh = token_with_exp((now + Duration::hours(1)).timestamp());
        let stale = token_with_exp((now - Duration::minutes(1)).timestamp());
        let nearly = token_with_exp((now + Duration::seconds(10)).timestamp());
        assert!(!is_expired(&fresh, now));
        assert!(is_expired(&stale, now));
        assert!(is_expired(&nearly, now));
    }

    #[test]
    fn test_exp_at_calendar_minimum_is_expired_not_a_panic() {
        let token = token_with_exp(DateTime::<Utc>::MIN_UTC.timestamp());
        assert!(is_expired(&token, Utc::now()));
    }

    #[test]
    fn test_malformed_tokens_count_as_expired() {
        assert!(expires_at("opaque-token").is_err());
        assert!(is_expired("opaque-token", Utc::now()));
        assert!(is_expired("a.!!!.c", Utc::now()));
    }
}
