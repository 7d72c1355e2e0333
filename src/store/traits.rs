use crate::logic::IssueFilter;
use crate::model::{Id, Issue, IssueUpdate, Project};
use anyhow::Result;

#[async_trait::async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>>;
    /// Return the project with this name, creating it if it does not exist
    async fn upsert_project(&self, name: &str) -> Result<Project>;
    async fn list_projects(&self) -> Result<Vec<Project>>;
}

#[async_trait::async_trait]
pub trait IssueStore: Send + Sync {
    async fn insert_issue(&self, issue: Issue) -> Result<Issue>;
    /// List the issues of a project matching the filter, oldest first
    async fn find_issues(&self, project_id: &Id, filter: &IssueFilter) -> Result<Vec<Issue>>;
    /// Apply an update to the issue with this id. `None` if there is no such issue.
    async fn update_issue(&self, id: &Id, update: &IssueUpdate) -> Result<Option<Issue>>;
    /// Remove the issue with this id, reporting whether one was removed
    async fn delete_issue(&self, id: &Id) -> Result<bool>;
}

pub trait Store: ProjectStore + IssueStore + Send + Sync {}
