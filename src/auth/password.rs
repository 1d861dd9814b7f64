//! Password hashing and verification.
//!
//! Argon2id with a fresh random salt per hash. The PHC string embeds the
//! algorithm, parameters, and salt, so verification needs no side channel and
//! the work factor can change here without migrating stored rows.
use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Hash a plaintext password into a PHC-format string.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|err| anyhow!("salt generation: {err}"))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|err| anyhow!("salt encoding: {err}"))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("password hashing: {err}"))?
        .to_string();
    Ok(phc)
}

/// Verify a plaintext password against a stored PHC string.
///
/// A malformed stored hash verifies as false rather than erroring; the caller
/// cannot do anything more useful with a corrupt row than reject the login.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_never_equals_plaintext_and_verifies() {
        let hash = hash_password("Passw0rd!").expect("hash");
        assert_ne!(hash, "Passw0rd!");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "Passw0rd!"));
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = hash_password("Passw0rd!").expect("hash");
        assert!(!verify_password(&hash, "wrong"));
    }

    #[test]
    fn same_password_hashes_differently_each_time() {
        let first = hash_password("Passw0rd!").expect("first");
        let second = hash_password("Passw0rd!").expect("second");
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_stored_hash_verifies_false() {
        assert!(!verify_password("not-a-phc-string", "Passw0rd!"));
        assert!(!verify_password("", "Passw0rd!"));
    }
}
