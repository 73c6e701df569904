//! Bearer-token authentication.
//!
//! Resolves the calling customer from the `Authorization: Bearer` header.
//! Token issuance lives with the identity provider; this extractor is the
//! whole of the `resolve_customer_id` contract the handlers depend on.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::utils::verify_token;

/// The authenticated customer on a request. Extracting this rejects the
/// request with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for Customer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims = verify_token(token).map_err(|err| {
            log::debug!("Rejected bearer token: {}", err);
            ApiError::Unauthorized
        })?;

        let id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)?;

        Ok(Customer {
            id,
            email: claims.email,
        })
    }
}
