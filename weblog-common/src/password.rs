use argon2::{
    Argon2,
    password_hash::{
        PasswordHash as PhcHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

#[derive(Clone, Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct PasswordHashError(argon2::password_hash::Error);

/// An Argon2id password hash in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes a plaintext password with a freshly generated salt.
    pub fn generate(password: &str) -> Result<Self, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// Wraps a PHC string as stored in the database. Malformed strings
    /// surface as an error on `verify`.
    #[must_use]
    pub fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    pub fn verify(&self, password: &str) -> Result<bool, PasswordHashError> {
        let parsed = PhcHash::new(&self.0).map_err(PasswordHashError)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHashError(err)),
        }
    }

    #[must_use]
    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[redacted]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_hash_verifies_the_password() {
        let hash = PasswordHash::generate("pw1").unwrap();

        assert!(hash.verify("pw1").unwrap());
        assert!(!hash.verify("wrong").unwrap());
    }

    #[test]
    fn hashing_the_same_password_twice_salts_differently() {
        let first = PasswordHash::generate("pw1").unwrap();
        let second = PasswordHash::generate("pw1").unwrap();

        assert_ne!(first.as_phc(), second.as_phc());
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        let hash = PasswordHash::from_phc("not-a-phc-string".to_owned());
        assert!(hash.verify("pw1").is_err());
    }

    #[test]
    fn debug_output_redacts_the_hash() {
        let hash = PasswordHash::generate("pw1").unwrap();
        assert!(!format!("{hash:?}").contains(hash.as_phc()));
    }
}
