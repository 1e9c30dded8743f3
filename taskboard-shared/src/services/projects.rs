/// Project lifecycle
///
/// Creating a project inserts the project and the creator's `admin`
/// membership in one transaction; if either insert fails neither is kept.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{require_text, ServiceError};
use crate::auth::authorization::{self, ProjectAction};
use crate::models::project::{CreateProject, Project, ProjectWithRole, UpdateProject};
use crate::models::project_member::{ProjectMember, ProjectRole};

const MAX_NAME_LEN: usize = 100;
const MAX_STATUS_LEN: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectService {
    pool: PgPool,
}

impl ProjectService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a project with `actor` as its first admin
    pub async fn create(
        &self,
        actor: Uuid,
        data: NewProject,
    ) -> Result<ProjectWithRole, ServiceError> {
        let name = require_text("Project name", &data.name, MAX_NAME_LEN)?;
        let status = data
            .status
            .as_deref()
            .map(|s| require_text("Status", s, MAX_STATUS_LEN))
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let project = Project::create(
            &mut *tx,
            CreateProject {
                name,
                description: data.description,
                due_date: data.due_date,
                status,
                manager_id: actor,
            },
        )
        .await?;

        ProjectMember::create(&mut *tx, project.id, actor, ProjectRole::Admin).await?;

        tx.commit().await?;

        info!(project_id = %project.id, user_id = %actor, "Project created");

        Ok(ProjectWithRole {
            project,
            role: ProjectRole::Admin,
        })
    }

    /// Projects the actor is a member of
    pub async fn list(&self, actor: Uuid) -> Result<Vec<ProjectWithRole>, ServiceError> {
        Ok(Project::list_for_member(&self.pool, actor).await?)
    }

    /// One project, if the actor is a member of it
    pub async fn get(&self, actor: Uuid, project_id: Uuid) -> Result<ProjectWithRole, ServiceError> {
        Project::find_for_member(&self.pool, project_id, actor)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Project not found".to_string()))
    }

    /// Updates project fields; admin only
    pub async fn update(
        &self,
        actor: Uuid,
        project_id: Uuid,
        mut changes: UpdateProject,
    ) -> Result<ProjectWithRole, ServiceError> {
        let role = authorization::require_role(
            &self.pool,
            project_id,
            actor,
            ProjectAction::UpdateProject,
        )
        .await?;

        if let Some(name) = changes.name.take() {
            changes.name = Some(require_text("Project name", &name, MAX_NAME_LEN)?);
        }
        if let Some(status) = changes.status.take() {
            changes.status = Some(require_text("Status", &status, MAX_STATUS_LEN)?);
        }

        let project = Project::update(&self.pool, project_id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Project not found".to_string()))?;

        info!(project_id = %project_id, user_id = %actor, "Project updated");

        Ok(ProjectWithRole { project, role })
    }

    /// Deletes a project with its tasks and memberships; admin only
    pub async fn delete(&self, actor: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        authorization::require_role(&self.pool, project_id, actor, ProjectAction::DeleteProject)
            .await?;

        if !Project::delete(&self.pool, project_id).await? {
            return Err(ServiceError::NotFound("Project not found".to_string()));
        }

        info!(project_id = %project_id, user_id = %actor, "Project deleted");
        Ok(())
    }
}
