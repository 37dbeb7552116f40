use std::collections::HashMap;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::access::CurrentUser;
use crate::config::ApiToken;
use crate::handlers::ApiError;
use crate::routes::AppState;

/// Static bearer tokens mapped to the user each one signs in as.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    users: HashMap<String, CurrentUser>,
}

impl TokenRegistry {
    pub fn new(tokens: &[ApiToken]) -> Self {
        let users = tokens
            .iter()
            .map(|t| {
                let name = format!("api-{}", t.role.as_str().to_ascii_lowercase());
                (t.token.clone(), CurrentUser::new(name, t.role))
            })
            .collect();
        Self { users }
    }

    pub fn lookup(&self, token: &str) -> Option<&CurrentUser> {
        self.users.get(token)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header format".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::Unauthorized(
            "Authorization header must use Bearer scheme".to_string(),
        )),
    }
}

/// Rejects requests without a known bearer token and attaches the
/// [`CurrentUser`] for handlers downstream.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = {
        let token = extract_bearer_token(request.headers())?;
        state.tokens.lookup(token).cloned().ok_or_else(|| {
            tracing::warn!(path = %request.uri().path(), "Rejected unknown bearer token");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
