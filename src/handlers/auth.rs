use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::app::AppState;
use crate::errors::AppResult;
use crate::extractors::{AppJson, OptionalJson};
use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, LogoutRequest, RegisterRequest,
    UserProfile,
};
use crate::services::Claims;

pub async fn register(
    State(state): State<AppState>,
    AppJson(form): AppJson<RegisterRequest>,
) -> AppResult<Response> {
    tracing::info!("Registration attempt for user: {}", form.username);

    let user = state.auth
        .register(&form.username, &form.email, &form.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserProfile::from(user))).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(form): AppJson<LoginRequest>,
) -> AppResult<Response> {
    tracing::info!("Login attempt for user: {}", form.username);

    let (tokens, user) = state.auth.login(&form.username, &form.password).await?;

    Ok(Json(LoginResponse { tokens, user: user.into() }).into_response())
}

#[axum::debug_handler(state = AppState)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OptionalJson(body): OptionalJson<LogoutRequest>,
) -> AppResult<Response> {
    let form = body.unwrap_or_default();

    state.auth
        .logout(&claims, form.refresh_token.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Response> {
    tracing::debug!("Refreshing tokens for user: {}", claims.username);

    let tokens = state.auth.refresh(&claims).await?;
    Ok(Json(tokens).into_response())
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(form): AppJson<ChangePasswordRequest>,
) -> AppResult<Response> {
    state.auth
        .change_password(&claims.sub, &form.current_password, &form.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Response> {
    let user = state.auth.profile(&claims.sub).await?;
    Ok(Json(UserProfile::from(user)).into_response())
}
