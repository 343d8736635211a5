use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The only MAC scheme tokens are issued and accepted with. The verifier
/// pins this, so a token cannot downgrade itself to `none` or swap schemes.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Process-wide token signing key: 32 random bytes drawn once at startup.
/// Held in memory only; a restart invalidates every outstanding token.
pub struct SecretKey([u8; 32]);

impl SecretKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a key from fixed bytes, for tests and externally managed keys.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Session claims carried by an issued token.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Claims {
    /// Authenticated username.
    pub sub: String,
    /// Student ids this session may access.
    pub students: Vec<String>,
    /// Expiry as seconds since the Unix epoch. Absent when the issuing
    /// config has no token lifetime; enforced by the verifier when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl Claims {
    pub fn new(subject: impl Into<String>, students: Vec<String>) -> Self {
        Self {
            sub: subject.into(),
            students,
            exp: None,
        }
    }

    pub fn expiring_in(mut self, lifetime: Duration) -> Self {
        let exp = SystemTime::now() + lifetime;
        self.exp = Some(exp.duration_since(UNIX_EPOCH).unwrap().as_secs());
        self
    }
}

pub(crate) fn issue_token(claims: &Claims, secret: &SecretKey) -> Result<String, AuthError> {
    let token = encode(
        &Header::new(SIGNING_ALGORITHM),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub(crate) fn verify_token(token: &str, secret: &SecretKey) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    // Expiry is optional in this design; tokens that carry one are still
    // rejected once it passes.
    validation.required_spec_claims.clear();

    let token = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(token.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn secret() -> SecretKey {
        SecretKey::from_bytes([7u8; 32])
    }

    fn sample_claims() -> Claims {
        Claims::new("admin", vec!["1234".into(), "5432".into()])
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let claims = sample_claims();
        let token = issue_token(&claims, &secret()).unwrap();
        assert_eq!(verify_token(&token, &secret()).unwrap(), claims);
    }

    #[test]
    fn wire_format_is_compact_jwt() {
        let token = issue_token(&sample_claims(), &secret()).unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        let header = URL_SAFE_NO_PAD.decode(segments[0]).unwrap();
        let header: serde_json::Value = serde_json::from_slice(&header).unwrap();
        assert_eq!(header["alg"], "HS256");
    }

    #[test]
    fn issuing_is_deterministic() {
        let a = issue_token(&sample_claims(), &secret()).unwrap();
        let b = issue_token(&sample_claims(), &secret()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let token = issue_token(&sample_claims(), &secret()).unwrap();
        // flip bits in the first signature character; unlike the final
        // character, all six of its bits survive base64 decoding
        let idx = token.rfind('.').unwrap() + 1;
        let mut bytes = token.clone().into_bytes();
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert_ne!(token, tampered);
        let err = verify_token(&tampered, &secret()).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(&sample_claims(), &secret()).unwrap();
        let other = SecretKey::from_bytes([8u8; 32]);
        let err = verify_token(&token, &other).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[test]
    fn structural_garbage_is_rejected() {
        for garbage in ["garbage", "a.b", "a.b.c.d", ""] {
            let err = verify_token(garbage, &secret()).unwrap_err();
            assert!(matches!(err, AuthError::InvalidToken { .. }), "{garbage}");
        }
    }

    #[test]
    fn unsigned_forgery_is_rejected() {
        // A token that declares alg "none" and carries no signature must
        // not be trusted to choose its own scheme.
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&sample_claims()).unwrap());
        let forged = format!("{header}.{payload}.");
        let err = verify_token(&forged, &secret()).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let mut claims = sample_claims();
        claims.exp = Some(now - 3600);
        let token = issue_token(&claims, &secret()).unwrap();
        let err = verify_token(&token, &secret()).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn token_without_expiry_is_accepted() {
        let claims = sample_claims();
        assert_eq!(claims.exp, None);
        let token = issue_token(&claims, &secret()).unwrap();
        assert!(verify_token(&token, &secret()).is_ok());
    }

    #[test]
    fn expiring_in_sets_a_future_expiry() {
        let claims = sample_claims().expiring_in(Duration::from_secs(3600));
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(claims.exp.unwrap() > now);
        let token = issue_token(&claims, &secret()).unwrap();
        assert!(verify_token(&token, &secret()).is_ok());
    }
}
