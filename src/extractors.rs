use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use crate::errors::AppError;

/// `axum::Json` with rejections routed through [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// A JSON body the client may leave out.
///
/// Only an empty body counts as absent. Anything else must parse, whatever
/// the `Content-Type` says, so a mistyped body is a 400 rather than ignored.
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }

        serde_json::from_slice(&body)
            .map(|value| Self(Some(value)))
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{self, header};
    use crate::models::LogoutRequest;

    async fn extract(content_type: Option<&str>, body: &str) -> Result<Option<LogoutRequest>, AppError> {
        let mut builder = http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let req = builder.body(axum::body::Body::from(body.to_string())).unwrap();
        OptionalJson::<LogoutRequest>::from_request(req, &()).await.map(|OptionalJson(v)| v)
    }

    #[tokio::test]
    async fn empty_body_is_absent() {
        assert!(extract(None, "").await.unwrap().is_none());
        assert!(extract(Some("application/json"), "  \n").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn body_without_content_type_is_still_parsed() {
        let form = extract(None, r#"{"refresh_token":"abc"}"#).await.unwrap().unwrap();
        assert_eq!(form.refresh_token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let err = extract(Some("application/json"), "{not json").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
