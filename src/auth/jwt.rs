use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::Claims;

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

pub fn generate_access_token(
    user_id: u64,
    username: String,
    role: u8,
    employee_id: Option<u64>,
    revision: u64,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    let claims = Claims {
        user_id,
        sub: username,
        role,
        employee_id,
        rev: revision,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let token = generate_access_token(4, "lead".into(), 2, Some(12), 7, "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 4);
        assert_eq!(claims.sub, "lead");
        assert_eq!(claims.employee_id, Some(12));
        assert_eq!(claims.rev, 7);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(4, "lead".into(), 2, None, 1, "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            user_id: 1,
            sub: "old".into(),
            role: 3,
            employee_id: None,
            rev: 1,
            exp: now() - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn every_token_gets_its_own_jti() {
        let a = generate_access_token(1, "a".into(), 3, None, 1, "s", 60).unwrap();
        let b = generate_access_token(1, "a".into(), 3, None, 1, "s", 60).unwrap();
        assert_ne!(verify_token(&a, "s").unwrap().jti, verify_token(&b, "s").unwrap().jti);
    }
}
