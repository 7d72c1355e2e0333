use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Postgres, QueryBuilder, Row,
};

use crate::logic::{FilterValues, IssueFilter};
use crate::model::{generate_id, now, Id, Issue, IssueUpdate, Project};
use crate::store::traits::{IssueStore, ProjectStore, Store};

const ISSUE_COLUMNS: &str = "id, project_id, issue_title, issue_text, created_by, assigned_to, open, status_text, created_on, updated_on";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the `projects` and `issues` tables if they are missing
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn issue_from_row(row: &PgRow) -> Issue {
    Issue {
        id: row.get("id"),
        issue_title: row.get("issue_title"),
        issue_text: row.get("issue_text"),
        created_by: row.get("created_by"),
        assigned_to: row.get("assigned_to"),
        open: row.get("open"),
        status_text: row.get("status_text"),
        project: row.get("project_id"),
        created_on: row.get("created_on"),
        updated_on: row.get("updated_on"),
    }
}

/// Build the project-scoped select for a filter. Each condition becomes an
/// `= ANY(...)` clause over its cast values.
fn find_issues_query<'a>(project_id: &'a Id, filter: &'a IssueFilter) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {} FROM issues WHERE project_id = ",
        ISSUE_COLUMNS
    ));
    query.push_bind(project_id);

    for condition in &filter.conditions {
        query.push(format!(" AND {} = ANY(", condition.field.column()));
        match &condition.values {
            FilterValues::Text(values) => query.push_bind(values.clone()),
            FilterValues::Bool(values) => query.push_bind(values.clone()),
            FilterValues::Timestamp(values) => query.push_bind(values.clone()),
        };
        query.push(")");
    }

    query.push(" ORDER BY created_on, id");
    query
}

#[async_trait::async_trait]
impl ProjectStore for PostgresStore {
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT id, name FROM projects WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch project")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Project {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }

    async fn upsert_project(&self, name: &str) -> Result<Project> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let row = sqlx::query(
            r#"
            INSERT INTO projects (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(generate_id())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert project")?;

        Ok(Project {
            id: row.get("id"),
            name: row.get("name"),
        })
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query("SELECT id, name FROM projects ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list projects")?;

        let projects = rows
            .into_iter()
            .map(|row| Project {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect();

        Ok(projects)
    }
}

#[async_trait::async_trait]
impl IssueStore for PostgresStore {
    async fn insert_issue(&self, issue: Issue) -> Result<Issue> {
        sqlx::query(
            r#"
            INSERT INTO issues (id, project_id, issue_title, issue_text, created_by, assigned_to, open, status_text, created_on, updated_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&issue.id)
        .bind(&issue.project)
        .bind(&issue.issue_title)
        .bind(&issue.issue_text)
        .bind(&issue.created_by)
        .bind(&issue.assigned_to)
        .bind(issue.open)
        .bind(&issue.status_text)
        .bind(issue.created_on)
        .bind(issue.updated_on)
        .execute(&self.pool)
        .await
        .context("Failed to insert issue")?;

        Ok(issue)
    }

    async fn find_issues(&self, project_id: &Id, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let rows = find_issues_query(project_id, filter)
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list issues")?;

        Ok(rows.iter().map(issue_from_row).collect())
    }

    async fn update_issue(&self, id: &Id, update: &IssueUpdate) -> Result<Option<Issue>> {
        let sql = format!(
            r#"
            UPDATE issues SET
                issue_title = COALESCE($2, issue_title),
                issue_text = COALESCE($3, issue_text),
                created_by = COALESCE($4, created_by),
                assigned_to = COALESCE($5, assigned_to),
                status_text = COALESCE($6, status_text),
                open = COALESCE($7, open),
                updated_on = $8
            WHERE id = $1
            RETURNING {}
            "#,
            ISSUE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&update.issue_title)
            .bind(&update.issue_text)
            .bind(&update.created_by)
            .bind(&update.assigned_to)
            .bind(&update.status_text)
            .bind(update.open)
            .bind(now())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to update issue")?;

        Ok(row.as_ref().map(issue_from_row))
    }

    async fn delete_issue(&self, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM issues WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete issue")?;

        Ok(result.rows_affected() == 1)
    }
}

impl Store for PostgresStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_query_without_filter() {
        let project_id = "5f1d7a3b2c4e6a8b9c0d1e2f".to_string();
        let filter = IssueFilter::default();
        let query = find_issues_query(&project_id, &filter);

        assert_eq!(
            query.sql(),
            format!(
                "SELECT {} FROM issues WHERE project_id = $1 ORDER BY created_on, id",
                ISSUE_COLUMNS
            )
        );
    }

    #[test]
    fn test_find_query_binds_each_condition() {
        let project_id = "5f1d7a3b2c4e6a8b9c0d1e2f".to_string();
        let filter = IssueFilter::from_query(vec![
            ("open".to_string(), "false".to_string()),
            ("_id".to_string(), project_id.clone()),
            ("assigned_to".to_string(), "bob".to_string()),
        ])
        .unwrap();
        let query = find_issues_query(&project_id, &filter);

        assert!(query.sql().ends_with(
            "WHERE project_id = $1 AND id = ANY($2) AND assigned_to = ANY($3) AND open = ANY($4) ORDER BY created_on, id"
        ));
    }
}
