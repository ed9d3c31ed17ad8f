use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use crate::app::AppState;
use crate::errors::AppError;
use crate::services::TokenKind;

/// Requires an access token and stores its `Claims` in the request extensions.
pub async fn require_access_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    authorize(&state, req, next, TokenKind::Access).await
}

/// Same check for the refresh endpoint, which is called with a refresh token.
pub async fn require_refresh_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    authorize(&state, req, next, TokenKind::Refresh).await
}

async fn authorize(state: &AppState, mut req: Request, next: Next, expected: TokenKind) -> Response {
    let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() else {
        tracing::debug!("Missing bearer token for {}", req.uri().path());
        return AppError::Unauthorized("Missing bearer token".into()).into_response();
    };

    match state.auth.authenticate(bearer.token(), expected).await {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}
