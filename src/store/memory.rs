use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::logic::IssueFilter;
use crate::model::{now, Id, Issue, IssueUpdate, Project};
use crate::store::traits::{IssueStore, ProjectStore, Store};

#[derive(Debug, Default)]
struct Inner {
    /// Projects keyed by name
    projects: HashMap<String, Project>,
    /// Issues in insertion order
    issues: Vec<Issue>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProjectStore for MemoryStore {
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        Ok(self.inner.read().projects.get(name).cloned())
    }

    async fn upsert_project(&self, name: &str) -> Result<Project> {
        let mut inner = self.inner.write();
        let project = inner
            .projects
            .entry(name.to_string())
            .or_insert_with(|| Project::new(name.to_string()));
        Ok(project.clone())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let inner = self.inner.read();
        let mut projects: Vec<Project> = inner.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }
}

#[async_trait::async_trait]
impl IssueStore for MemoryStore {
    async fn insert_issue(&self, issue: Issue) -> Result<Issue> {
        self.inner.write().issues.push(issue.clone());
        Ok(issue)
    }

    async fn find_issues(&self, project_id: &Id, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let inner = self.inner.read();
        Ok(inner
            .issues
            .iter()
            .filter(|issue| &issue.project == project_id && filter.matches(issue))
            .cloned()
            .collect())
    }

    async fn update_issue(&self, id: &Id, update: &IssueUpdate) -> Result<Option<Issue>> {
        let mut inner = self.inner.write();
        let Some(issue) = inner.issues.iter_mut().find(|issue| &issue.id == id) else {
            return Ok(None);
        };

        update.apply(issue, now());
        Ok(Some(issue.clone()))
    }

    async fn delete_issue(&self, id: &Id) -> Result<bool> {
        let mut inner = self.inner.write();
        let before = inner.issues.len();
        inner.issues.retain(|issue| &issue.id != id);
        Ok(inner.issues.len() < before)
    }
}

impl Store for MemoryStore {}
