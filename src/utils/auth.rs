use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;

/// Claims carried by the identity provider's bearer tokens. This service
/// only verifies them; issuance happens upstream.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // customer id
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn issue_token(customer_id: Uuid, email: &str) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: customer_id.to_string(),
            email: email.to_string(),
            exp: (now + Duration::hours(24)).timestamp(),
            iat: now.timestamp(),
        };
        let secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .expect("encode token")
    }

    #[test]
    fn token_round_trip() {
        env::set_var("JWT_SECRET", "test-secret");

        let id = Uuid::new_v4();
        let token = issue_token(id, "casey@example.com");
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.email, "casey@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn garbage_token_is_rejected() {
        env::set_var("JWT_SECRET", "test-secret");
        assert!(verify_token("not-a-jwt").is_err());
    }
}
