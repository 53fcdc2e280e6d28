/// Photographer authentication
///
/// Photographer calls carry an HS256 bearer JWT whose `sub` is the user id.
/// Client calls are authenticated by the portal token in the body instead.
use crate::{api::middleware::extract_bearer_token, context::AppContext, error::PortalError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};

/// Claims of a photographer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotographerClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

/// Caller identity, if any
///
/// A missing header is not an error here; the engine decides whether the
/// operation needs a user. A header that is present but invalid is.
#[derive(Debug, Clone, Default)]
pub struct Photographer {
    pub user_id: Option<String>,
}

impl Photographer {
    pub fn id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for Photographer {
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &AppContext) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer_token(&parts.headers) else {
            return Ok(Photographer::default());
        };

        let data = verify_jwt_token(&token, &state.config.authentication.jwt_secret)?;
        if data.claims.sub.is_empty() {
            return Err(PortalError::Unauthenticated(
                "Invalid token: missing 'sub' claim".to_string(),
            ));
        }

        Ok(Photographer {
            user_id: Some(data.claims.sub),
        })
    }
}

/// Verify signature and expiry of a photographer token
pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<TokenData<PhotographerClaims>, PortalError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    decode::<PhotographerClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                PortalError::Unauthenticated("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                PortalError::Unauthenticated("Invalid token signature".to_string())
            }
            _ => PortalError::Unauthenticated("Invalid token".to_string()),
        }
    })
}

/// Sign a photographer token, for tests
#[cfg(test)]
pub fn issue_token(user_id: &str, jwt_secret: &str, ttl: chrono::Duration) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = PhotographerClaims {
        sub: user_id.to_string(),
        exp: (now + ttl).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .unwrap()
}
