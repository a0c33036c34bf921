use crate::core::errors::SplitError;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID
    pub iat: usize,
    pub exp: usize,
}

pub struct JwtService {
    secret: String,
    ttl: Duration,
}

impl JwtService {
    pub fn new(secret: String, ttl: Duration) -> Self {
        JwtService { secret, ttl }
    }

    pub fn generate_token(&self, user_id: &str) -> Result<String, SplitError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as usize)
            .map_err(|e| SplitError::InternalServerError(format!("Time error: {}", e)))?;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SplitError::InternalServerError(format!("JWT encoding error: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, SplitError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| SplitError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let jwt = JwtService::new("test-secret".to_string(), Duration::from_secs(60));
        let token = jwt.generate_token("alice").unwrap();
        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_rejects_foreign_or_garbage_tokens() {
        let jwt = JwtService::new("test-secret".to_string(), Duration::from_secs(60));
        let other = JwtService::new("other-secret".to_string(), Duration::from_secs(60));
        let token = other.generate_token("alice").unwrap();

        assert!(matches!(jwt.validate_token(&token), Err(SplitError::InvalidToken(_))));
        assert!(matches!(jwt.validate_token("not-a-jwt"), Err(SplitError::InvalidToken(_))));
    }
}
