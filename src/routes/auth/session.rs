use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::access::Actor;
use crate::errors::ApiError;
use crate::routes::auth::claims::Claims;
use crate::utils::jwt::{decode_jwt, JwtKeyProvider};

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

impl AuthSession {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: JwtKeyProvider + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthenticated("Authorization token required".into()))?;

        let data = decode_jwt(
            token,
            state.jwt_keys(),
            state.jwt_issuer(),
            state.jwt_audience(),
        )
        .map_err(|_| ApiError::Unauthenticated("Invalid or expired token".into()))?;

        Ok(AuthSession(data.claims))
    }
}
