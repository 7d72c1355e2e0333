use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Form, Json,
};
use serde_json::{Map, Value};

use crate::api::handlers::ErrorResponse;
use crate::logic::sanitize_map;

/// Request body fields, accepted as JSON or as a URL-encoded form, with
/// operator keys already stripped.
///
/// An empty body yields no fields. A JSON body that is not an object also
/// yields no fields. Without a recognised content type the body is read as
/// JSON if it parses and ignored otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFields(pub Map<String, Value>);

impl RequestFields {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestFields
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let fields = match body_kind(req.headers()) {
            BodyKind::Form => {
                let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                    .await
                    .map_err(|e| bad_request(&e.body_text()))?;
                pairs
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect()
            }
            kind => {
                let bytes = Bytes::from_request(req, state)
                    .await
                    .map_err(|e| bad_request(&e.body_text()))?;
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    Map::new()
                } else {
                    match (serde_json::from_slice::<Value>(&bytes), kind) {
                        (Ok(Value::Object(map)), _) => map,
                        (Ok(_), _) => Map::new(),
                        (Err(_), BodyKind::Unknown) => Map::new(),
                        (Err(e), _) => {
                            return Err(bad_request(&format!("Invalid JSON body: {}", e)))
                        }
                    }
                }
            }
        };

        Ok(Self(sanitize_map(fields)))
    }
}

enum BodyKind {
    Json,
    Form,
    Unknown,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        BodyKind::Form
    } else if content_type.starts_with("application/json") {
        BodyKind::Json
    } else {
        BodyKind::Unknown
    }
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    log::debug!("Rejected request body: {}", message);
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;

    async fn extract(content_type: Option<&str>, body: &str) -> Result<RequestFields, StatusCode> {
        let mut builder = axum::http::Request::builder()
            .method("PUT")
            .uri("/api/issues/test");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();

        RequestFields::from_request(req, &()).await.map_err(|(status, _)| status)
    }

    #[tokio::test]
    async fn test_json_body() {
        let fields = extract(Some("application/json"), r#"{"_id": "abc", "open": false}"#)
            .await
            .unwrap();
        assert_eq!(fields.get("_id"), Some(&json!("abc")));
        assert_eq!(fields.get("open"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_form_body() {
        let fields = extract(
            Some("application/x-www-form-urlencoded"),
            "issue_title=Hello+world&open=false",
        )
        .await
        .unwrap();
        assert_eq!(fields.get("issue_title"), Some(&json!("Hello world")));
        assert_eq!(fields.get("open"), Some(&json!("false")));
    }

    #[tokio::test]
    async fn test_empty_body_without_content_type() {
        let fields = extract(None, "").await.unwrap();
        assert!(fields.as_map().is_empty());
    }

    #[tokio::test]
    async fn test_operator_keys_are_stripped() {
        let fields = extract(
            Some("application/json"),
            r#"{"_id": {"$ne": null}, "$where": "1", "issue_text": "x"}"#,
        )
        .await
        .unwrap();
        assert_eq!(fields.get("_id"), Some(&json!({})));
        assert!(fields.get("$where").is_none());
        assert_eq!(fields.get("issue_text"), Some(&json!("x")));
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let status = extract(Some("application/json"), "{not json").await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unrecognised_content_type_with_text_body_has_no_fields() {
        let fields = extract(Some("text/plain"), "issue_title=x").await.unwrap();
        assert!(fields.as_map().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognised_content_type_with_json_body() {
        let fields = extract(None, r#"{"issue_title": "x"}"#).await.unwrap();
        assert_eq!(fields.get("issue_title"), Some(&json!("x")));
    }
}
