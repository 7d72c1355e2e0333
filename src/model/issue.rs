use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{generate_id, now, Id};

pub const ISSUE_TITLE: &str = "issue_title";
pub const ISSUE_TEXT: &str = "issue_text";
pub const CREATED_BY: &str = "created_by";
pub const ASSIGNED_TO: &str = "assigned_to";
pub const STATUS_TEXT: &str = "status_text";
pub const OPEN: &str = "open";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("required field(s) missing")]
    MissingRequiredFields,
    #[error("field '{0}' must be a string")]
    InvalidField(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "_id")]
    pub id: Id,
    pub issue_title: String,
    pub issue_text: String,
    pub created_by: String,
    pub assigned_to: String,
    pub open: bool,
    pub status_text: String,
    pub project: Id,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Client input for creating an issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
    pub issue_title: Option<String>,
    pub issue_text: Option<String>,
    pub created_by: Option<String>,
    pub assigned_to: Option<String>,
    pub status_text: Option<String>,
}

impl NewIssue {
    /// Read the creation fields out of a request body. Numbers and booleans
    /// are taken in their string form; anything else is rejected.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ValidationError> {
        Ok(Self {
            issue_title: text_field(fields, ISSUE_TITLE)?,
            issue_text: text_field(fields, ISSUE_TEXT)?,
            created_by: text_field(fields, CREATED_BY)?,
            assigned_to: text_field(fields, ASSIGNED_TO)?,
            status_text: text_field(fields, STATUS_TEXT)?,
        })
    }

    /// Check required fields and build the issue to persist under `project`.
    pub fn validate(self, project: Id) -> Result<Issue, ValidationError> {
        let issue_title = required(self.issue_title)?;
        let issue_text = required(self.issue_text)?;
        let created_on = now();

        Ok(Issue {
            id: generate_id(),
            issue_title,
            issue_text,
            created_by: self.created_by.unwrap_or_default(),
            assigned_to: self.assigned_to.unwrap_or_default(),
            open: true,
            status_text: self.status_text.unwrap_or_default(),
            project,
            created_on,
            updated_on: created_on,
        })
    }
}

fn required(value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ValidationError::MissingRequiredFields),
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Result<Option<String>, ValidationError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(ValidationError::InvalidField(key.to_string())),
    }
}

/// The set of changes a PUT carries. Only non-blank text fields are kept, and
/// `open` can only ever be switched off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
}

impl IssueUpdate {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ValidationError> {
        let keep = |key: &str| -> Result<Option<String>, ValidationError> {
            Ok(text_field(fields, key)?.filter(|value| !value.trim().is_empty()))
        };

        let open = match fields.get(OPEN) {
            Some(Value::Bool(false)) => Some(false),
            Some(Value::String(s)) if s == "false" => Some(false),
            _ => None,
        };

        Ok(Self {
            issue_title: keep(ISSUE_TITLE)?,
            issue_text: keep(ISSUE_TEXT)?,
            created_by: keep(CREATED_BY)?,
            assigned_to: keep(ASSIGNED_TO)?,
            status_text: keep(STATUS_TEXT)?,
            open,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.issue_title.is_none()
            && self.issue_text.is_none()
            && self.created_by.is_none()
            && self.assigned_to.is_none()
            && self.status_text.is_none()
            && self.open.is_none()
    }

    pub fn apply(&self, issue: &mut Issue, updated_on: DateTime<Utc>) {
        if let Some(title) = &self.issue_title {
            issue.issue_title = title.clone();
        }
        if let Some(text) = &self.issue_text {
            issue.issue_text = text.clone();
        }
        if let Some(created_by) = &self.created_by {
            issue.created_by = created_by.clone();
        }
        if let Some(assigned_to) = &self.assigned_to {
            issue.assigned_to = assigned_to.clone();
        }
        if let Some(status_text) = &self.status_text {
            issue.status_text = status_text.clone();
        }
        if let Some(open) = self.open {
            issue.open = open;
        }
        issue.updated_on = updated_on;
    }
}
