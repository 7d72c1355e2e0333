use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::api::body_extractor::RequestFields;
use crate::api::project_extractor::ProjectName;
use crate::logic::IssueFilter;
use crate::model::{parse_id, Issue, IssueUpdate, NewIssue, Project};
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

pub const PROJECT_NOT_FOUND: &str = "Project not found";
pub const REQUIRED_FIELDS_MISSING: &str = "required field(s) missing";
pub const MISSING_ID: &str = "missing _id";
pub const NO_UPDATE_FIELDS: &str = "no update field(s) sent";
pub const COULD_NOT_UPDATE: &str = "could not update";
pub const COULD_NOT_DELETE: &str = "could not delete";
pub const UPDATED: &str = "successfully updated";
pub const DELETED: &str = "successfully deleted";

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Echo of the `_id` the client sent, when there was one
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            id: None,
        }
    }

    pub fn with_id(message: &str, id: &str) -> Self {
        Self {
            error: message.to_string(),
            id: Some(id.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub result: String,
    #[serde(rename = "_id")]
    pub id: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Failures on PUT and DELETE are still answered with 200
fn rejected(message: &str, id: &str) -> HandlerError {
    (StatusCode::OK, Json(ErrorResponse::with_id(message, id)))
}

fn internal_error(e: anyhow::Error) -> HandlerError {
    log::error!("Store failure: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&e.to_string())),
    )
}

/// The `_id` the client asked for, rendered as a string. Missing, null,
/// empty, zero and `false` values count as absent.
fn requested_id(fields: &RequestFields) -> Option<String> {
    match fields.get("_id")? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub async fn list_issues<S: Store>(
    State(store): State<AppState<S>>,
    ProjectName(project_name): ProjectName,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Issue>>, HandlerError> {
    let project = match store.find_project_by_name(&project_name).await {
        Ok(Some(project)) => project,
        Ok(None) => {
            log::debug!("No project named '{}'", project_name);
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(PROJECT_NOT_FOUND)),
            ));
        }
        Err(e) => return Err(internal_error(e)),
    };

    let filter = match IssueFilter::from_query(params) {
        Ok(filter) => filter,
        Err(e) => {
            log::warn!("Rejected filter on project '{}': {}", project_name, e);
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(PROJECT_NOT_FOUND)),
            ));
        }
    };

    match store.find_issues(&project.id, &filter).await {
        Ok(issues) => Ok(Json(issues)),
        Err(e) => Err(internal_error(e)),
    }
}

pub async fn create_issue<S: Store>(
    State(store): State<AppState<S>>,
    ProjectName(project_name): ProjectName,
    fields: RequestFields,
) -> Result<Json<Issue>, HandlerError> {
    // The project is created even when the issue turns out to be invalid
    let project = store
        .upsert_project(&project_name)
        .await
        .map_err(internal_error)?;

    let issue = match NewIssue::from_fields(fields.as_map()).and_then(|new| new.validate(project.id)) {
        Ok(issue) => issue,
        Err(e) => {
            log::debug!("Rejected new issue on '{}': {}", project_name, e);
            return Err((
                StatusCode::OK,
                Json(ErrorResponse::new(REQUIRED_FIELDS_MISSING)),
            ));
        }
    };

    let issue = store.insert_issue(issue).await.map_err(internal_error)?;
    log::info!("Created issue {} on project '{}'", issue.id, project_name);
    Ok(Json(issue))
}

pub async fn update_issue<S: Store>(
    State(store): State<AppState<S>>,
    ProjectName(project_name): ProjectName,
    fields: RequestFields,
) -> Result<Json<ResultResponse>, HandlerError> {
    let Some(raw_id) = requested_id(&fields) else {
        return Err((StatusCode::OK, Json(ErrorResponse::new(MISSING_ID))));
    };

    let update = match IssueUpdate::from_fields(fields.as_map()) {
        Ok(update) => update,
        Err(e) => {
            log::debug!("Rejected update of {}: {}", raw_id, e);
            return Err(rejected(COULD_NOT_UPDATE, &raw_id));
        }
    };
    if update.is_empty() {
        return Err(rejected(NO_UPDATE_FIELDS, &raw_id));
    }

    let Some(id) = parse_id(&raw_id) else {
        log::debug!("Malformed issue id '{}'", raw_id);
        return Err(rejected(COULD_NOT_UPDATE, &raw_id));
    };

    match store.update_issue(&id, &update).await {
        Ok(Some(issue)) => {
            log::info!("Updated issue {} on project '{}'", issue.id, project_name);
            Ok(Json(ResultResponse {
                result: UPDATED.to_string(),
                id: raw_id,
            }))
        }
        Ok(None) => Err(rejected(COULD_NOT_UPDATE, &raw_id)),
        Err(e) => {
            log::error!("Failed to update issue {}: {:#}", raw_id, e);
            Err(rejected(COULD_NOT_UPDATE, &raw_id))
        }
    }
}

pub async fn delete_issue<S: Store>(
    State(store): State<AppState<S>>,
    ProjectName(project_name): ProjectName,
    fields: RequestFields,
) -> Result<Json<ResultResponse>, HandlerError> {
    let Some(raw_id) = requested_id(&fields) else {
        return Err((StatusCode::OK, Json(ErrorResponse::new(MISSING_ID))));
    };

    let Some(id) = parse_id(&raw_id) else {
        log::debug!("Malformed issue id '{}'", raw_id);
        return Err(rejected(COULD_NOT_DELETE, &raw_id));
    };

    match store.delete_issue(&id).await {
        Ok(true) => {
            log::info!("Deleted issue {} on project '{}'", id, project_name);
            Ok(Json(ResultResponse {
                result: DELETED.to_string(),
                id: raw_id,
            }))
        }
        Ok(false) => Err(rejected(COULD_NOT_DELETE, &raw_id)),
        Err(e) => {
            log::error!("Failed to delete issue {}: {:#}", raw_id, e);
            Err(rejected(COULD_NOT_DELETE, &raw_id))
        }
    }
}

pub async fn list_projects<S: Store>(
    State(store): State<AppState<S>>,
) -> Result<Json<Vec<Project>>, HandlerError> {
    store.list_projects().await.map(Json).map_err(internal_error)
}

pub async fn get_api_docs() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Issue Tracker API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: '/docs/openapi.json',
                dom_id: '#swagger-ui',
            });
        };
    </script>
</body>
</html>"#,
    )
}

pub async fn get_openapi_spec() -> Json<Value> {
    let issue_fields = serde_json::json!({
        "issue_title": {"type": "string"},
        "issue_text": {"type": "string"},
        "created_by": {"type": "string"},
        "assigned_to": {"type": "string"},
        "status_text": {"type": "string"}
    });
    let project_param = serde_json::json!({
        "name": "project",
        "in": "path",
        "required": true,
        "schema": {"type": "string"}
    });
    let id_body = serde_json::json!({
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": {"_id": {"type": "string"}}
                }
            }
        }
    });

    Json(serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Issue Tracker API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Create, list, update and delete issues grouped by project."
        },
        "servers": [{"url": "/", "description": "Current server"}],
        "paths": {
            "/health": {
                "get": {
                    "summary": "Health check",
                    "responses": {"200": {"description": "Service is up"}}
                }
            },
            "/api/projects": {
                "get": {
                    "summary": "List projects",
                    "responses": {
                        "200": {
                            "description": "All projects",
                            "content": {"application/json": {"schema": {
                                "type": "array",
                                "items": {"$ref": "#/components/schemas/Project"}
                            }}}
                        }
                    }
                }
            },
            "/api/issues/{project}": {
                "get": {
                    "summary": "List the issues of a project",
                    "description": "Any issue field may be passed as a query parameter to filter by equality. Repeating a parameter matches any of its values.",
                    "parameters": [project_param],
                    "responses": {
                        "200": {
                            "description": "Matching issues",
                            "content": {"application/json": {"schema": {
                                "type": "array",
                                "items": {"$ref": "#/components/schemas/Issue"}
                            }}}
                        },
                        "404": {
                            "description": "Project not found",
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ErrorResponse"}}}
                        }
                    }
                },
                "post": {
                    "summary": "Create an issue, creating the project if needed",
                    "parameters": [project_param],
                    "requestBody": {
                        "content": {"application/json": {"schema": {
                            "type": "object",
                            "required": ["issue_title", "issue_text"],
                            "properties": issue_fields
                        }}}
                    },
                    "responses": {
                        "200": {
                            "description": "The stored issue, or an error when required fields are missing",
                            "content": {"application/json": {"schema": {"oneOf": [
                                {"$ref": "#/components/schemas/Issue"},
                                {"$ref": "#/components/schemas/ErrorResponse"}
                            ]}}}
                        }
                    }
                },
                "put": {
                    "summary": "Update an issue",
                    "description": "Blank fields are ignored. `open` can only be set to false.",
                    "parameters": [project_param],
                    "requestBody": {
                        "content": {"application/json": {"schema": {
                            "type": "object",
                            "required": ["_id"],
                            "properties": {
                                "_id": {"type": "string"},
                                "issue_title": {"type": "string"},
                                "issue_text": {"type": "string"},
                                "created_by": {"type": "string"},
                                "assigned_to": {"type": "string"},
                                "status_text": {"type": "string"},
                                "open": {"type": "string", "enum": ["false"]}
                            }
                        }}}
                    },
                    "responses": {
                        "200": {
                            "description": "Result or error",
                            "content": {"application/json": {"schema": {"oneOf": [
                                {"$ref": "#/components/schemas/ResultResponse"},
                                {"$ref": "#/components/schemas/ErrorResponse"}
                            ]}}}
                        }
                    }
                },
                "delete": {
                    "summary": "Delete an issue",
                    "parameters": [project_param],
                    "requestBody": id_body,
                    "responses": {
                        "200": {
                            "description": "Result or error",
                            "content": {"application/json": {"schema": {"oneOf": [
                                {"$ref": "#/components/schemas/ResultResponse"},
                                {"$ref": "#/components/schemas/ErrorResponse"}
                            ]}}}
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Project": {
                    "type": "object",
                    "properties": {
                        "_id": {"type": "string"},
                        "name": {"type": "string"}
                    }
                },
                "Issue": {
                    "type": "object",
                    "properties": {
                        "_id": {"type": "string"},
                        "issue_title": {"type": "string"},
                        "issue_text": {"type": "string"},
                        "created_by": {"type": "string"},
                        "assigned_to": {"type": "string"},
                        "open": {"type": "boolean"},
                        "status_text": {"type": "string"},
                        "project": {"type": "string"},
                        "created_on": {"type": "string", "format": "date-time"},
                        "updated_on": {"type": "string", "format": "date-time"}
                    }
                },
                "ResultResponse": {
                    "type": "object",
                    "properties": {
                        "result": {"type": "string"},
                        "_id": {"type": "string"}
                    }
                },
                "ErrorResponse": {
                    "type": "object",
                    "properties": {
                        "error": {"type": "string"},
                        "_id": {"type": "string"}
                    }
                }
            }
        }
    }))
}
