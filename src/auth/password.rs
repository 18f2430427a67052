use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, hashed: &str) -> Result<(), argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hashed)?;

    Argon2::default().verify_password(password.as_bytes(), &parsed)
}

/// Minimum rules for a new account password.
pub fn password_is_acceptable(password: &str) -> bool {
    password.chars().count() >= 8 && !password.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hashed).is_ok());
        assert!(verify_password("wrong horse", &hashed).is_err());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_panic() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(!password_is_acceptable("short"));
        assert!(password_is_acceptable("long enough"));
    }
}
