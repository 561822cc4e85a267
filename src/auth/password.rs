//! Password hashing and verification.
//!
//! New hashes are Argon2id PHC strings. Verification dispatches on the
//! stored hash itself: PHC strings carry their algorithm, version and cost
//! parameters, and `$2a$`/`$2b$`/`$2y$` strings are bcrypt hashes written by
//! the previous deployment. Both verifiers compare in constant time.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Password hash formats recognised by [`verify_password`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2,
    Bcrypt,
}

/// Identify the scheme of a stored hash, or `None` if it is not a hash we can verify.
pub fn hash_scheme(hash: &str) -> Option<HashScheme> {
    if ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
    {
        return Some(HashScheme::Bcrypt);
    }
    match PasswordHash::new(hash) {
        Ok(parsed) if parsed.algorithm.as_str().starts_with("argon2") => Some(HashScheme::Argon2),
        _ => None,
    }
}

/// Hash a password using Argon2id with the crate's default parameters.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// Malformed or unrecognised hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match hash_scheme(hash) {
        Some(HashScheme::Bcrypt) => bcrypt::verify(password, hash).unwrap_or(false),
        Some(HashScheme::Argon2) => {
            let Ok(parsed) = PasswordHash::new(hash) else {
                return false;
            };
            // Argon2::default() only supplies defaults; the variant, version
            // and params are taken from the parsed hash.
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{Algorithm, Params, Version};

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2id$"));
        assert_eq!(hash_scheme(&hash), Some(HashScheme::Argon2));

        assert!(verify_password(password, &hash));
        assert!(!verify_password("wrong_password", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_uses_embedded_params() {
        // A hash produced with non-default parameters and variant must still verify.
        let params = Params::new(8 * 1024, 3, 2, None).unwrap();
        let argon2 = Argon2::new(Algorithm::Argon2i, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(b"legacy-params", &salt)
            .unwrap()
            .to_string();

        assert!(hash.starts_with("$argon2i$"));
        assert!(verify_password("legacy-params", &hash));
        assert!(!verify_password("other", &hash));
    }

    #[test]
    fn test_verify_legacy_bcrypt() {
        let hash = bcrypt::hash("admin123", 4).unwrap();
        assert_eq!(hash_scheme(&hash), Some(HashScheme::Bcrypt));
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("admin124", &hash));
    }

    #[test]
    fn test_verify_php_style_2y_prefix() {
        // PHP's password_hash() emits $2y$; same algorithm as $2b$.
        let hash = bcrypt::hash("admin123", 4).unwrap().replacen("$2b$", "$2y$", 1);
        assert!(hash.starts_with("$2y$"));
        assert!(verify_password("admin123", &hash));
        assert!(!verify_password("nope", &hash));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        assert!(!verify_password("", ""));
        assert!(!verify_password("password", "password"));
        assert!(!verify_password("password", "$argon2id$garbage"));
        assert!(!verify_password("password", "$2y$10$tooshort"));
        assert_eq!(hash_scheme("plaintext"), None);
    }
}
