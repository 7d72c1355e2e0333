use chrono::{DateTime, Utc};
use itertools::Itertools;
use thiserror::Error;

use crate::logic::sanitize::is_operator_key;
use crate::model::{parse_id, Issue};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("cannot filter '{field}' by '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// Issue fields a client may filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Id,
    IssueTitle,
    IssueText,
    CreatedBy,
    AssignedTo,
    Open,
    StatusText,
    CreatedOn,
    UpdatedOn,
}

impl FilterField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "_id" => Some(Self::Id),
            "issue_title" => Some(Self::IssueTitle),
            "issue_text" => Some(Self::IssueText),
            "created_by" => Some(Self::CreatedBy),
            "assigned_to" => Some(Self::AssignedTo),
            "open" => Some(Self::Open),
            "status_text" => Some(Self::StatusText),
            "created_on" => Some(Self::CreatedOn),
            "updated_on" => Some(Self::UpdatedOn),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Id => "_id",
            Self::IssueTitle => "issue_title",
            Self::IssueText => "issue_text",
            Self::CreatedBy => "created_by",
            Self::AssignedTo => "assigned_to",
            Self::Open => "open",
            Self::StatusText => "status_text",
            Self::CreatedOn => "created_on",
            Self::UpdatedOn => "updated_on",
        }
    }

    /// Column holding this field in the `issues` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            other => other.key(),
        }
    }
}

/// Accepted values for one field, already cast to the field's type
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValues {
    Text(Vec<String>),
    Bool(Vec<bool>),
    Timestamp(Vec<DateTime<Utc>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: FilterField,
    pub values: FilterValues,
}

impl Condition {
    fn parse(field: FilterField, raw: Vec<String>) -> Result<Self, FilterError> {
        let invalid = |value: &str| FilterError::InvalidValue {
            field: field.key(),
            value: value.to_string(),
        };

        let values = match field {
            FilterField::Id => FilterValues::Text(
                raw.iter()
                    .map(|value| parse_id(value).ok_or_else(|| invalid(value.as_str())))
                    .collect::<Result<_, _>>()?,
            ),
            FilterField::Open => FilterValues::Bool(
                raw.iter()
                    .map(|value| match value.trim() {
                        "true" | "1" => Ok(true),
                        "false" | "0" => Ok(false),
                        _ => Err(invalid(value.as_str())),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            FilterField::CreatedOn | FilterField::UpdatedOn => FilterValues::Timestamp(
                raw.iter()
                    .map(|value| {
                        DateTime::parse_from_rfc3339(value.trim())
                            .map(|ts| ts.with_timezone(&Utc))
                            .map_err(|_| invalid(value.as_str()))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            _ => FilterValues::Text(raw),
        };

        Ok(Self { field, values })
    }

    fn matches(&self, issue: &Issue) -> bool {
        match &self.values {
            FilterValues::Text(values) => {
                let actual = match self.field {
                    FilterField::Id => &issue.id,
                    FilterField::IssueTitle => &issue.issue_title,
                    FilterField::IssueText => &issue.issue_text,
                    FilterField::CreatedBy => &issue.created_by,
                    FilterField::AssignedTo => &issue.assigned_to,
                    FilterField::StatusText => &issue.status_text,
                    _ => return false,
                };
                values.iter().any(|value| value == actual)
            }
            FilterValues::Bool(values) => values.contains(&issue.open),
            FilterValues::Timestamp(values) => {
                let actual = match self.field {
                    FilterField::CreatedOn => issue.created_on,
                    FilterField::UpdatedOn => issue.updated_on,
                    _ => return false,
                };
                values.contains(&actual)
            }
        }
    }
}

/// Equality filter over issue fields, built from query-string pairs.
///
/// Unknown keys are dropped, as are operator keys and `project` (the project
/// scope is imposed by the caller). A key given more than once matches any
/// of its values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFilter {
    pub conditions: Vec<Condition>,
}

impl IssueFilter {
    pub fn from_query<I>(pairs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let grouped = pairs
            .into_iter()
            .filter(|(key, _)| !is_operator_key(key))
            .filter_map(|(key, value)| FilterField::from_key(&key).map(|field| (field, value)))
            .into_group_map();

        let conditions = grouped
            .into_iter()
            .sorted_by_key(|(field, _)| *field)
            .map(|(field, raw)| Condition::parse(field, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { conditions })
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        self.conditions.iter().all(|condition| condition.matches(issue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewIssue;

    fn create_test_issue(title: &str, assigned_to: &str) -> Issue {
        NewIssue {
            issue_title: Some(title.to_string()),
            issue_text: Some("text".to_string()),
            created_by: Some("tester".to_string()),
            assigned_to: Some(assigned_to.to_string()),
            status_text: None,
        }
        .validate("5f1d7a3b2c4e6a8b9c0d1e2f".to_string())
        .unwrap()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = IssueFilter::from_query(Vec::new()).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches(&create_test_issue("a", "b")));
    }

    #[test]
    fn test_single_and_multiple_filters() {
        let issue = create_test_issue("toUpdate", "funcTests");

        let one = IssueFilter::from_query(pairs(&[("issue_title", "toUpdate")])).unwrap();
        assert!(one.matches(&issue));

        let both = IssueFilter::from_query(pairs(&[
            ("issue_title", "toUpdate"),
            ("assigned_to", "funcTests"),
        ]))
        .unwrap();
        assert!(both.matches(&issue));

        let mismatch = IssueFilter::from_query(pairs(&[
            ("issue_title", "toUpdate"),
            ("assigned_to", "someoneElse"),
        ]))
        .unwrap();
        assert!(!mismatch.matches(&issue));
    }

    #[test]
    fn test_unknown_operator_and_project_keys_ignored() {
        let filter = IssueFilter::from_query(pairs(&[
            ("colour", "red"),
            ("$where", "1"),
            ("project", "other"),
        ]))
        .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_repeated_key_matches_any() {
        let filter = IssueFilter::from_query(pairs(&[
            ("assigned_to", "alice"),
            ("assigned_to", "bob"),
        ]))
        .unwrap();

        assert_eq!(filter.conditions.len(), 1);
        assert!(filter.matches(&create_test_issue("t", "bob")));
        assert!(!filter.matches(&create_test_issue("t", "carol")));
    }

    #[test]
    fn test_open_filter_casts_booleans() {
        let mut issue = create_test_issue("t", "a");

        let open = IssueFilter::from_query(pairs(&[("open", "true")])).unwrap();
        assert!(open.matches(&issue));

        issue.open = false;
        assert!(!open.matches(&issue));

        let err = IssueFilter::from_query(pairs(&[("open", "maybe")])).unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidValue {
                field: "open",
                value: "maybe".to_string()
            }
        );
    }

    #[test]
    fn test_id_and_timestamp_filters() {
        let issue = create_test_issue("t", "a");

        let by_id = IssueFilter::from_query(vec![("_id".to_string(), issue.id.to_uppercase())]).unwrap();
        assert!(by_id.matches(&issue));

        let by_created = IssueFilter::from_query(vec![(
            "created_on".to_string(),
            issue.created_on.to_rfc3339(),
        )])
        .unwrap();
        assert!(by_created.matches(&issue));

        assert!(IssueFilter::from_query(pairs(&[("_id", "invalidID")])).is_err());
        assert!(IssueFilter::from_query(pairs(&[("updated_on", "yesterday")])).is_err());
    }

    #[test]
    fn test_conditions_are_ordered_by_field() {
        let filter = IssueFilter::from_query(pairs(&[
            ("status_text", "x"),
            ("issue_title", "y"),
        ]))
        .unwrap();

        let fields: Vec<_> = filter.conditions.iter().map(|c| c.field).collect();
        assert_eq!(fields, vec![FilterField::IssueTitle, FilterField::StatusText]);
    }
}
