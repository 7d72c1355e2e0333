use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
    Json,
};

use crate::api::handlers::ErrorResponse;

/// The `:project` path segment. Undecodable segments are rejected with a
/// JSON error body like every other failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectName(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ProjectName
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(name)) => Ok(Self(name)),
            Err(e) => {
                log::debug!("Rejected project segment: {}", e.body_text());
                Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&e.body_text()))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    async fn echo(ProjectName(name): ProjectName) -> String {
        name
    }

    async fn call(uri: &str) -> (StatusCode, String) {
        let app: Router = Router::new().route("/api/issues/:project", get(echo));
        let req = axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_decodes_project_segment() {
        let (status, body) = call("/api/issues/my%20project").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "my project");
    }

    #[tokio::test]
    async fn test_invalid_utf8_segment_gets_json_error() {
        let (status, body) = call("/api/issues/%FF").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(value["error"].is_string());
    }
}
