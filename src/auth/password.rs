use argon2::{
    Argon2,
    password_hash::{Error, PasswordHash, PasswordVerifier},
};

use crate::error::AppError;

/// `Ok(false)` on mismatch; a stored hash that is not a PHC string is an
/// internal error.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hashed).map_err(|e| {
        tracing::error!(error = %e, "Stored password hash is malformed");
        AppError::internal(e)
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(AppError::internal(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

    fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn matching_password_verifies() {
        assert!(verify_password("hunter2", &hash("hunter2")).unwrap());
    }

    #[test]
    fn mismatch_is_false_not_error() {
        assert!(!verify_password("hunter3", &hash("hunter2")).unwrap());
    }

    #[test]
    fn garbage_hash_is_internal() {
        assert!(matches!(verify_password("x", "plaintext"), Err(AppError::Internal(_))));
    }
}
