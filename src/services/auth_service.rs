//! Password and token handling.
//!
//! Passwords are hashed with bcrypt on the blocking pool. Tokens are HS256
//! JWTs of two kinds: short-lived access tokens for API calls and longer
//! refresh tokens that can only be traded for a new pair. Logging out or
//! refreshing revokes the presented token's `jti` until it would have expired.

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::config::AuthConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{TokenPair, User};
use crate::repositories::{normalize_email, TokenRepository, UserRepository};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,  // user id
    pub username: String,
    pub jti: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn remaining_secs(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(1) as u64
    }
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        config: AuthConfig,
    ) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self { users, tokens, config, encoding_key, decoding_key }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username cannot be empty".into()));
        }
        let email = normalize_email(email);
        if !is_plausible_email(&email) {
            return Err(AppError::Validation("Email address is invalid".into()));
        }
        validate_password(password)?;

        let password_hash = hash_password(password, self.config.bcrypt_cost).await?;
        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user).await?;
        tracing::info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Accepts either a username or an email address as `identifier`.
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<(TokenPair, User)> {
        let identifier = identifier.trim();
        let user = if identifier.contains('@') {
            self.users.find_by_email(identifier).await?
        } else {
            self.users.find_by_username(identifier).await?
        };

        let Some(user) = user else {
            tracing::info!("Login attempt for unknown user: {}", identifier);
            return Err(AppError::invalid_credentials());
        };

        if !verify_password(password, &user.password_hash).await? {
            tracing::info!("Invalid password for user: {}", user.username);
            return Err(AppError::invalid_credentials());
        }

        let tokens = self.issue_tokens(&user)?;
        tracing::info!("User {} logged in", user.username);
        Ok((tokens, user))
    }

    /// Revokes the access token and, when given, the caller's refresh token.
    ///
    /// The refresh token is checked first so a rejected call changes nothing.
    pub async fn logout(&self, access: &Claims, refresh_token: Option<&str>) -> AppResult<()> {
        let refresh = match refresh_token {
            Some(token) => {
                let refresh = self.authenticate(token, TokenKind::Refresh).await?;
                if refresh.sub != access.sub {
                    return Err(AppError::Unauthorized("Refresh token belongs to another user".into()));
                }
                Some(refresh)
            }
            None => None,
        };

        // Already-revoked tokens are fine here
        self.tokens.revoke(&access.jti, access.remaining_secs()).await?;
        if let Some(refresh) = refresh {
            self.tokens.revoke(&refresh.jti, refresh.remaining_secs()).await?;
        }

        tracing::info!("User {} logged out", access.username);
        Ok(())
    }

    /// Trades a refresh token for a new pair. The old refresh token is revoked.
    pub async fn refresh(&self, refresh: &Claims) -> AppResult<TokenPair> {
        if refresh.kind != TokenKind::Refresh {
            return Err(AppError::Unauthorized("Invalid token type".into()));
        }
        let user = self.users.find_by_id(&refresh.sub).await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

        if !self.tokens.revoke(&refresh.jti, refresh.remaining_secs()).await? {
            tracing::warn!("Refresh token reuse for user {}", user.username);
            return Err(AppError::Unauthorized("Token has been revoked".into()));
        }
        tracing::debug!("Rotated refresh token for user {}", user.username);
        self.issue_tokens(&user)
    }

    pub async fn change_password(&self, user_id: &str, current: &str, new: &str) -> AppResult<()> {
        let mut user = self.profile(user_id).await?;

        if !verify_password(current, &user.password_hash).await? {
            return Err(AppError::Unauthorized("Current password is incorrect".into()));
        }
        validate_password(new)?;
        if current == new {
            return Err(AppError::Validation(
                "New password must differ from the current password".into(),
            ));
        }

        user.password_hash = hash_password(new, self.config.bcrypt_cost).await?;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        tracing::info!("Password changed for user {}", user.username);
        Ok(())
    }

    pub async fn profile(&self, user_id: &str) -> AppResult<User> {
        self.users.find_by_id(user_id).await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    /// Validates signature, expiry, kind and revocation of a bearer token.
    pub async fn authenticate(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                AppError::Unauthorized("Invalid or expired token".into())
            })?
            .claims;

        if claims.kind != expected {
            return Err(AppError::Unauthorized("Invalid token type".into()));
        }
        if self.tokens.is_revoked(&claims.jti).await? {
            return Err(AppError::Unauthorized("Token has been revoked".into()));
        }
        Ok(claims)
    }

    fn issue_tokens(&self, user: &User) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.sign(user, TokenKind::Access, self.config.access_token_ttl_secs)?,
            refresh_token: self.sign(user, TokenKind::Refresh, self.config.refresh_token_ttl_secs)?,
            token_type: "Bearer".into(),
            expires_in: self.config.access_token_ttl_secs,
        })
    }

    fn sign(&self, user: &User, kind: TokenKind, ttl_secs: i64) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            kind,
            iat: now,
            exp: now + ttl_secs,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(password.as_bytes(), cost))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();
    tokio::task::spawn_blocking(move || verify(password.as_bytes(), &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::repositories::MemoryRepository;

    fn service() -> AuthService {
        let repo = Arc::new(MemoryRepository::new());
        AuthService::new(repo.clone(), repo, Config::for_tests().auth)
    }

    #[tokio::test]
    async fn register_then_login_by_username_or_email() {
        let auth = service();
        let user = auth.register("alice", "Alice@Example.com", "password123").await.unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_ne!(user.password_hash, "password123");

        let (tokens, logged_in) = auth.login("alice", "password123").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(tokens.token_type, "Bearer");

        let (_, by_email) = auth.login("alice@example.com", "password123").await.unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn register_validates_fields() {
        let auth = service();
        assert!(matches!(
            auth.register("", "a@b.c", "password123").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.register("bob", "not-an-email", "password123").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.register("bob", "bob@example.com", "short").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let auth = service();
        auth.register("alice", "alice@example.com", "password123").await.unwrap();
        let err = auth.register("alice", "alice2@example.com", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let auth = service();
        auth.register("alice", "alice@example.com", "password123").await.unwrap();

        let wrong = auth.login("alice", "wrong-password").await.unwrap_err();
        let unknown = auth.login("nobody", "password123").await.unwrap_err();
        assert_eq!(wrong.to_string(), "Invalid credentials");
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn tokens_are_checked_for_kind() {
        let auth = service();
        auth.register("alice", "alice@example.com", "password123").await.unwrap();
        let (tokens, user) = auth.login("alice", "password123").await.unwrap();

        let claims = auth.authenticate(&tokens.access_token, TokenKind::Access).await.unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "alice");

        let err = auth.authenticate(&tokens.access_token, TokenKind::Refresh).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid token type");
        assert!(auth.authenticate("garbage", TokenKind::Access).await.is_err());
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let auth = service();
        let user = auth.register("alice", "alice@example.com", "password123").await.unwrap();

        let mut config = Config::for_tests().auth;
        config.jwt_secret = "another-secret".into();
        let repo = Arc::new(MemoryRepository::new());
        let other = AuthService::new(repo.clone(), repo, config);
        let forged = other.issue_tokens(&user).unwrap();

        assert!(auth.authenticate(&forged.access_token, TokenKind::Access).await.is_err());
    }

    #[tokio::test]
    async fn logout_revokes_access_and_refresh_tokens() {
        let auth = service();
        auth.register("alice", "alice@example.com", "password123").await.unwrap();
        let (tokens, _) = auth.login("alice", "password123").await.unwrap();
        let claims = auth.authenticate(&tokens.access_token, TokenKind::Access).await.unwrap();

        auth.logout(&claims, Some(&tokens.refresh_token)).await.unwrap();

        let err = auth.authenticate(&tokens.access_token, TokenKind::Access).await.unwrap_err();
        assert_eq!(err.to_string(), "Token has been revoked");
        assert!(auth.authenticate(&tokens.refresh_token, TokenKind::Refresh).await.is_err());
    }

    #[tokio::test]
    async fn refresh_rotates_the_refresh_token() {
        let auth = service();
        auth.register("alice", "alice@example.com", "password123").await.unwrap();
        let (tokens, _) = auth.login("alice", "password123").await.unwrap();

        let claims = auth.authenticate(&tokens.refresh_token, TokenKind::Refresh).await.unwrap();
        let fresh = auth.refresh(&claims).await.unwrap();

        assert!(auth.authenticate(&fresh.access_token, TokenKind::Access).await.is_ok());
        assert!(auth.authenticate(&tokens.refresh_token, TokenKind::Refresh).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_refreshes_spend_the_token_once() {
        let auth = service();
        auth.register("alice", "alice@example.com", "password123").await.unwrap();
        let (tokens, _) = auth.login("alice", "password123").await.unwrap();

        // Both requests pass the revocation check before either rotates
        let first = auth.authenticate(&tokens.refresh_token, TokenKind::Refresh).await.unwrap();
        let second = auth.authenticate(&tokens.refresh_token, TokenKind::Refresh).await.unwrap();
        let (a, b) = tokio::join!(auth.refresh(&first), auth.refresh(&second));

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let err = a.err().or(b.err()).unwrap();
        assert_eq!(err.to_string(), "Token has been revoked");
    }

    #[tokio::test]
    async fn logout_with_a_foreign_refresh_token_changes_nothing() {
        let auth = service();
        auth.register("alice", "alice@example.com", "password123").await.unwrap();
        auth.register("bob", "bob@example.com", "password123").await.unwrap();
        let (alice, _) = auth.login("alice", "password123").await.unwrap();
        let (bob, _) = auth.login("bob", "password123").await.unwrap();
        let claims = auth.authenticate(&alice.access_token, TokenKind::Access).await.unwrap();

        let err = auth.logout(&claims, Some(&bob.refresh_token)).await.unwrap_err();
        assert_eq!(err.to_string(), "Refresh token belongs to another user");

        assert!(auth.authenticate(&alice.access_token, TokenKind::Access).await.is_ok());
        assert!(auth.authenticate(&bob.refresh_token, TokenKind::Refresh).await.is_ok());
    }

    #[tokio::test]
    async fn logout_with_a_spent_refresh_token_keeps_the_session() {
        let auth = service();
        auth.register("alice", "alice@example.com", "password123").await.unwrap();
        let (tokens, _) = auth.login("alice", "password123").await.unwrap();
        let refresh = auth.authenticate(&tokens.refresh_token, TokenKind::Refresh).await.unwrap();
        let fresh = auth.refresh(&refresh).await.unwrap();
        let claims = auth.authenticate(&fresh.access_token, TokenKind::Access).await.unwrap();

        assert!(auth.logout(&claims, Some(&tokens.refresh_token)).await.is_err());
        assert!(auth.authenticate(&fresh.access_token, TokenKind::Access).await.is_ok());
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let auth = service();
        let user = auth.register("alice", "alice@example.com", "password123").await.unwrap();

        let err = auth.change_password(&user.id, "wrong-password", "newpassword1").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        auth.change_password(&user.id, "password123", "newpassword1").await.unwrap();
        assert!(auth.login("alice", "password123").await.is_err());
        assert!(auth.login("alice", "newpassword1").await.is_ok());
    }
}
