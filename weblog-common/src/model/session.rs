//! Stateless session tokens.
//!
//! A token binds a user id to an expiry instant and carries an
//! HMAC-SHA256 signature over both. Validity is purely a function of
//! the signature and the embedded expiry; nothing is persisted, which
//! also means issued tokens cannot be revoked before they expire.

use crate::model::{Id, user::UserMarker};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::Sha256;
use std::{
    fmt::{Debug, Display, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const SESSION_TOKEN_TTL: Duration = Duration::hours(24);
pub const SESSION_SIGNATURE_LEN: usize = 32;
pub const SESSION_SECRET_MIN_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug, Error)]
pub enum InvalidSessionSecretError {
    #[error("The session secret must be at least {SESSION_SECRET_MIN_LEN} bytes long")]
    TooShort,
    #[error("The session secret was rejected: {0}")]
    Rejected(#[from] InvalidLength),
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum SessionTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(uuid::Error),
    #[error("Invalid expiry timestamp: {0}")]
    InvalidExpiry(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the signature part is incorrect")]
    InvalidSignatureLength,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
pub enum SessionVerifyError {
    #[error("The token signature does not match")]
    Invalid,
    #[error("The token has expired")]
    Expired,
}

/// A decoded session token: subject, expiry as a unix timestamp in
/// seconds, and the signature over both.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionToken {
    pub user_id: Id<UserMarker>,
    pub expires_at: i64,
    pub signature: [u8; SESSION_SIGNATURE_LEN],
}

/// Process-wide signing key, constructed once from configuration.
#[derive(Clone)]
pub struct SessionKey {
    mac: HmacSha256,
}

impl SessionKey {
    pub fn new(secret: &[u8]) -> Result<Self, InvalidSessionSecretError> {
        if secret.len() < SESSION_SECRET_MIN_LEN {
            return Err(InvalidSessionSecretError::TooShort);
        }

        let mac = HmacSha256::new_from_slice(secret)?;
        Ok(Self { mac })
    }

    #[must_use]
    pub fn issue(&self, user_id: Id<UserMarker>, now: UtcDateTime) -> SessionToken {
        let expires_at = (now + SESSION_TOKEN_TTL).unix_timestamp();
        let signature = self.sign(user_id, expires_at);

        SessionToken {
            user_id,
            expires_at,
            signature,
        }
    }

    /// Checks the signature, then the expiry. On success returns the
    /// embedded identity. There is no guarantee the user still exists;
    /// callers needing the account must re-fetch it.
    pub fn verify(
        &self,
        token: &SessionToken,
        now: UtcDateTime,
    ) -> Result<Id<UserMarker>, SessionVerifyError> {
        let mut mac = self.mac.clone();
        mac.update(payload(token.user_id, token.expires_at).as_bytes());
        mac.verify_slice(&token.signature)
            .map_err(|_| SessionVerifyError::Invalid)?;

        if now.unix_timestamp() >= token.expires_at {
            return Err(SessionVerifyError::Expired);
        }

        Ok(token.user_id)
    }

    fn sign(&self, user_id: Id<UserMarker>, expires_at: i64) -> [u8; SESSION_SIGNATURE_LEN] {
        let mut mac = self.mac.clone();
        mac.update(payload(user_id, expires_at).as_bytes());
        mac.finalize().into_bytes().into()
    }
}

fn payload(user_id: Id<UserMarker>, expires_at: i64) -> String {
    format!("{user_id}:{expires_at}")
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let encoded_signature = Base64Display::new(&self.signature, &BASE64_STANDARD);
        write!(f, "{}:{}:{encoded_signature}", self.user_id, self.expires_at)
    }
}

impl FromStr for SessionToken {
    type Err = SessionTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let expiry_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let signature_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = user_id_part.parse().map_err(Self::Err::InvalidUserId)?;
        let expires_at = expiry_part.parse().map_err(Self::Err::InvalidExpiry)?;
        let signature = BASE64_STANDARD
            .decode(signature_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSignatureLength)?;

        Ok(Self {
            user_id,
            expires_at,
            signature,
        })
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .field("signature", &"[redacted]")
            .finish()
    }
}

impl Debug for SessionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionKey").field(&"[redacted]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::utc_datetime;

    const NOW: UtcDateTime = utc_datetime!(2026-01-01 00:00);

    fn key() -> SessionKey {
        SessionKey::new(b"0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn rejects_short_secrets() {
        assert!(matches!(
            SessionKey::new(b"short"),
            Err(InvalidSessionSecretError::TooShort)
        ));
    }

    #[test]
    fn issued_token_verifies_to_the_same_identity() {
        let user = Id::random();
        let token = key().issue(user, NOW);

        assert_eq!(key().verify(&token, NOW).unwrap(), user);
        assert_eq!(token.expires_at, (NOW + SESSION_TOKEN_TTL).unix_timestamp());
    }

    #[test]
    fn token_survives_display_and_parse() {
        let token = key().issue(Id::random(), NOW);
        let parsed: SessionToken = token.to_string().parse().unwrap();

        assert_eq!(parsed, token);
        assert!(key().verify(&parsed, NOW).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = key().issue(Id::random(), NOW);
        let later = NOW + SESSION_TOKEN_TTL;

        assert_eq!(
            key().verify(&token, later).unwrap_err(),
            SessionVerifyError::Expired
        );
        // One second before the boundary is still fine.
        assert!(key().verify(&token, later - Duration::seconds(1)).is_ok());
    }

    #[test]
    fn tampered_subject_is_rejected() {
        let mut token = key().issue(Id::random(), NOW);
        token.user_id = Id::random();

        assert_eq!(
            key().verify(&token, NOW).unwrap_err(),
            SessionVerifyError::Invalid
        );
    }

    #[test]
    fn tampered_expiry_is_rejected() {
        let mut token = key().issue(Id::random(), NOW);
        token.expires_at += 3600;

        assert_eq!(
            key().verify(&token, NOW).unwrap_err(),
            SessionVerifyError::Invalid
        );
    }

    #[test]
    fn token_from_a_different_key_is_rejected() {
        let other = SessionKey::new(b"another-secret-another-secret").unwrap();
        let token = other.issue(Id::random(), NOW);

        assert_eq!(
            key().verify(&token, NOW).unwrap_err(),
            SessionVerifyError::Invalid
        );
    }

    #[test]
    fn malformed_strings_do_not_parse() {
        assert!(matches!(
            "nonsense".parse::<SessionToken>(),
            Err(SessionTokenDecodeError::NotEnoughParts)
        ));
        assert!(matches!(
            "not-a-uuid:123:YWJj".parse::<SessionToken>(),
            Err(SessionTokenDecodeError::InvalidUserId(_))
        ));

        let user = Id::<UserMarker>::random();
        assert!(matches!(
            format!("{user}:abc:YWJj").parse::<SessionToken>(),
            Err(SessionTokenDecodeError::InvalidExpiry(_))
        ));
        assert!(matches!(
            format!("{user}:123:YWJj").parse::<SessionToken>(),
            Err(SessionTokenDecodeError::InvalidSignatureLength)
        ));
    }

    #[test]
    fn debug_output_redacts_the_signature() {
        let token = key().issue(Id::random(), NOW);
        let output = format!("{token:?}");

        assert!(output.contains("[redacted]"));
        assert!(!output.contains(&token.to_string()));
    }
}
