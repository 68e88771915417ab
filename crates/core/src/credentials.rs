//! Password hashing and temporary credential generation for imported users.
//!
//! All password hashes use the Argon2id variant with a cryptographically random
//! salt generated via [`OsRng`]. The PHC string format is used for storage so
//! that algorithm parameters and salt are embedded in the hash itself.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;

/// Length of a generated temporary password (alphanumeric characters).
pub const TEMP_PASSWORD_LENGTH: usize = 16;

/// Minimum length for passwords supplied in an import file.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Credentials ready to be persisted for a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    /// PHC-formatted Argon2id hash.
    pub password_hash: String,
    /// Whether the user must pick a new password on first login.
    pub must_change_password: bool,
}

/// Generate a random alphanumeric temporary password.
///
/// The plaintext is returned to the operator once and never persisted.
pub fn generate_temporary_password() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(TEMP_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted Argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Validate that a password meets minimum strength requirements.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {min_length} characters long"
        ));
    }
    Ok(())
}

/// Build stored credentials for a new account.
///
/// A supplied password is hashed as-is. When none is supplied a temporary
/// password is generated, the account is flagged to change it on first login,
/// and the plaintext is returned alongside the credentials.
pub fn credentials_for_new_user(
    supplied: Option<&str>,
) -> Result<(StoredCredentials, Option<String>), argon2::password_hash::Error> {
    match supplied {
        Some(password) => {
            let password_hash = hash_password(password)?;
            Ok((
                StoredCredentials {
                    password_hash,
                    must_change_password: false,
                },
                None,
            ))
        }
        None => {
            let temporary = generate_temporary_password();
            let password_hash = hash_password(&temporary)?;
            Ok((
                StoredCredentials {
                    password_hash,
                    must_change_password: true,
                },
                Some(temporary),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"), "expected argon2id PHC prefix");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
        assert!(!verify_password("wrong-password", &hash).expect("verify should succeed"));
    }

    #[test]
    fn temporary_passwords_are_alphanumeric_and_distinct() {
        let a = generate_temporary_password();
        let b = generate_temporary_password();
        assert_eq!(a.len(), TEMP_PASSWORD_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn password_strength_boundaries() {
        assert!(validate_password_strength("short", 12)
            .unwrap_err()
            .contains("at least 12 characters"));
        assert!(validate_password_strength("twelve_chars", 12).is_ok());
    }

    #[test]
    fn new_user_without_password_gets_temporary_one() {
        let (creds, temporary) = credentials_for_new_user(None).unwrap();
        let temporary = temporary.expect("temporary password should be returned");
        assert!(creds.must_change_password);
        assert!(verify_password(&temporary, &creds.password_hash).unwrap());
    }

    #[test]
    fn new_user_with_password_keeps_it() {
        let (creds, temporary) = credentials_for_new_user(Some("a-long-enough-secret")).unwrap();
        assert!(temporary.is_none());
        assert!(!creds.must_change_password);
        assert!(verify_password("a-long-enough-secret", &creds.password_hash).unwrap());
    }
}
