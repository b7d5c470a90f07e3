use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::Settings;

/// Raw entropy per session token before encoding.
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("password hashing failed")]
    Hashing,
    #[error("password verification failed")]
    Verification,
}

fn argon2_from_settings(settings: &Settings) -> Result<Argon2<'static>, SecurityError> {
    let security = settings.security();
    let params = argon2::Params::new(
        security.argon2_memory_kib,
        security.argon2_time_cost,
        security.argon2_parallelism,
        None,
    )
    .map_err(|_| SecurityError::Hashing)?;
    Ok(Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
}

pub(crate) fn hash_password(password: &str, settings: &Settings) -> Result<String, SecurityError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = argon2_from_settings(settings)?;

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| SecurityError::Hashing)?
        .to_string();

    Ok(hash)
}

/// Verification reads the cost parameters embedded in the stored hash, so
/// hashes created under older settings keep verifying after a cost bump.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, SecurityError> {
    let parsed = PasswordHash::new(hash).map_err(|_| SecurityError::Verification)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(SecurityError::Verification),
    }
}

/// A freshly minted session token: the plaintext goes to the client once,
/// only the hash is ever persisted.
pub(crate) struct MintedToken {
    pub(crate) plaintext: String,
    pub(crate) hash: String,
}

pub(crate) fn mint_session_token() -> MintedToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_session_token(&plaintext);
    MintedToken { plaintext, hash }
}

pub(crate) fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Settings;

    #[test]
    fn password_hash_roundtrip() {
        let settings = Settings::load().expect("settings");
        let hash = hash_password("correct-horse-battery-staple", &settings).expect("hash");
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn minted_tokens_are_unique_and_base64url() {
        let first = mint_session_token();
        let second = mint_session_token();

        assert_ne!(first.plaintext, second.plaintext);
        assert_ne!(first.hash, second.hash);
        // 32 bytes -> 43 chars of unpadded base64url
        assert_eq!(first.plaintext.len(), 43);
        assert!(first
            .plaintext
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }

    #[test]
    fn token_hash_is_stable_and_distinct_from_plaintext() {
        let minted = mint_session_token();
        assert_eq!(hash_session_token(&minted.plaintext), minted.hash);
        assert_ne!(minted.hash, minted.plaintext);
        assert_eq!(minted.hash.len(), 64);
    }
}
