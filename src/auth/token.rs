// JWT token generation and validation service

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::models::Role;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // user_id
    pub email: String,
    pub role: Role,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

/// Token service for JWT operations
pub struct TokenService {
    secret: String,
    access_token_duration: i64, // in seconds
}

impl TokenService {
    /// Access tokens expire in 15 minutes (900 seconds)
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            access_token_duration: 900,
        }
    }

    /// Issue an access token. The storefront does this in production; the
    /// service itself uses it for tooling and tests.
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now,
            exp: now + self.access_token_duration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_token_service() -> TokenService {
        TokenService::new("test_secret_key_for_testing_purposes".to_string())
    }

    #[test]
    fn test_access_token_expiration_is_15_minutes() {
        let service = test_token_service();
        let token = service
            .generate_access_token(Uuid::new_v4(), "admin@example.com", Role::Admin)
            .unwrap();
        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_invalid() {
        let token = TokenService::new("another_secret".to_string())
            .generate_access_token(Uuid::new_v4(), "admin@example.com", Role::Admin)
            .unwrap();
        let result = test_token_service().validate_access_token(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let service = test_token_service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key_for_testing_purposes"),
        )
        .unwrap();

        assert!(matches!(
            service.validate_access_token(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    proptest! {
        #[test]
        fn prop_claims_round_trip_identity(email in "[a-z]{1,10}@[a-z]{1,10}\\.com", admin in any::<bool>()) {
            let service = test_token_service();
            let user_id = Uuid::new_v4();
            let role = if admin { Role::Admin } else { Role::Customer };

            let token = service.generate_access_token(user_id, &email, role).unwrap();
            let claims = service.validate_access_token(&token).unwrap();

            prop_assert_eq!(claims.sub, user_id);
            prop_assert_eq!(claims.email, email);
            prop_assert_eq!(claims.role, role);
        }

        #[test]
        fn prop_garbage_tokens_are_rejected(token in "[a-zA-Z0-9._-]{0,64}") {
            prop_assert!(test_token_service().validate_access_token(&token).is_err());
        }
    }
}
