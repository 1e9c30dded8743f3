/// Task lifecycle
///
/// Any member of a project may create, view and edit its tasks; only admins
/// and managers may delete them. An assignee must be a member of the task's
/// project.
///
/// When a task gains an assignee other than the actor, the injected
/// [`Notifier`] is told after the write has committed. Notifier failures are
/// logged and never fail the operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{require_text, ServiceError};
use crate::auth::authorization::{self, ProjectAction};
use crate::models::project_member::ProjectMember;
use crate::models::task::{CreateTask, Task, TaskFilter, UpdateTask};
use crate::notify::{Notifier, TaskAssigned};

const MAX_TITLE_LEN: usize = 200;
const MAX_STATUS_LEN: usize = 50;
const MAX_PRIORITY_LEN: usize = 20;

#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct TaskService {
    pool: PgPool,
    notifier: Arc<dyn Notifier>,
}

fn task_not_found() -> ServiceError {
    ServiceError::NotFound("Task not found".to_string())
}

impl TaskService {
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        Self { pool, notifier }
    }

    /// Creates a task in a project the actor belongs to
    pub async fn create(&self, actor: Uuid, data: NewTask) -> Result<Task, ServiceError> {
        let title = require_text("Title", &data.title, MAX_TITLE_LEN)?;
        let status = optional_label("Status", data.status, MAX_STATUS_LEN)?;
        let priority = optional_label("Priority", data.priority, MAX_PRIORITY_LEN)?;

        authorization::require_role(&self.pool, data.project_id, actor, ProjectAction::CreateTask)
            .await?;

        if let Some(assignee) = data.assignee_id {
            self.ensure_assignable(data.project_id, assignee).await?;
        }

        let task = Task::create(
            &self.pool,
            CreateTask {
                project_id: data.project_id,
                title,
                description: data.description,
                status,
                priority,
                due_date: data.due_date,
                assignee_id: data.assignee_id,
            },
        )
        .await?;

        info!(task_id = %task.id, project_id = %task.project_id, user_id = %actor, "Task created");

        if let Some(assignee) = task.assignee_id {
            self.notify_assignment(actor, assignee, &task).await;
        }

        Ok(task)
    }

    /// Tasks across the actor's projects, optionally filtered
    pub async fn list(&self, actor: Uuid, filter: &TaskFilter) -> Result<Vec<Task>, ServiceError> {
        Ok(Task::list_visible(&self.pool, actor, filter).await?)
    }

    pub async fn get(&self, actor: Uuid, task_id: Uuid) -> Result<Task, ServiceError> {
        Task::find_visible(&self.pool, task_id, actor)
            .await?
            .ok_or_else(task_not_found)
    }

    /// Updates any subset of task fields
    pub async fn update(
        &self,
        actor: Uuid,
        task_id: Uuid,
        mut changes: UpdateTask,
    ) -> Result<Task, ServiceError> {
        let current = self.get(actor, task_id).await?;

        if let Some(title) = changes.title.take() {
            changes.title = Some(require_text("Title", &title, MAX_TITLE_LEN)?);
        }
        if let Some(status) = changes.status.take() {
            changes.status = Some(require_text("Status", &status, MAX_STATUS_LEN)?);
        }
        if let Some(priority) = changes.priority.take() {
            changes.priority = Some(optional_label("Priority", priority, MAX_PRIORITY_LEN)?);
        }
        if let Some(Some(assignee)) = changes.assignee_id {
            self.ensure_assignable(current.project_id, assignee).await?;
        }

        if changes.is_empty() {
            return Ok(current);
        }

        let task = Task::update(&self.pool, task_id, changes)
            .await?
            .ok_or_else(task_not_found)?;

        info!(task_id = %task_id, user_id = %actor, "Task updated");

        if let Some(assignee) = task.assignee_id {
            if current.assignee_id != Some(assignee) {
                self.notify_assignment(actor, assignee, &task).await;
            }
        }

        Ok(task)
    }

    /// Sets the workflow status; any non-empty label is accepted
    pub async fn set_status(
        &self,
        actor: Uuid,
        task_id: Uuid,
        status: String,
    ) -> Result<Task, ServiceError> {
        self.update(
            actor,
            task_id,
            UpdateTask {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Assigns the task to a project member, or unassigns it with `None`
    pub async fn assign(
        &self,
        actor: Uuid,
        task_id: Uuid,
        assignee: Option<Uuid>,
    ) -> Result<Task, ServiceError> {
        self.update(
            actor,
            task_id,
            UpdateTask {
                assignee_id: Some(assignee),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes a task; admins and managers of its project only
    pub async fn delete(&self, actor: Uuid, task_id: Uuid) -> Result<(), ServiceError> {
        let task = self.get(actor, task_id).await?;

        authorization::require_role(&self.pool, task.project_id, actor, ProjectAction::DeleteTask)
            .await?;

        if !Task::delete(&self.pool, task_id).await? {
            return Err(task_not_found());
        }

        info!(task_id = %task_id, user_id = %actor, "Task deleted");
        Ok(())
    }

    async fn ensure_assignable(&self, project_id: Uuid, assignee: Uuid) -> Result<(), ServiceError> {
        if !ProjectMember::is_member(&self.pool, project_id, assignee).await? {
            return Err(ServiceError::Validation(
                "Assignee must be a member of the project".to_string(),
            ));
        }
        Ok(())
    }

    async fn notify_assignment(&self, actor: Uuid, assignee: Uuid, task: &Task) {
        if assignee == actor {
            return;
        }

        let event = TaskAssigned {
            task_id: task.id,
            task_title: task.title.clone(),
            project_id: task.project_id,
            assigned_by: actor,
        };

        if let Err(e) = self.notifier.task_assigned(assignee, event).await {
            warn!(
                error = %e,
                task_id = %task.id,
                assignee_id = %assignee,
                "Failed to queue assignment notification"
            );
        }
    }
}

/// Trims an optional label, treating blank as absent
fn optional_label(
    field: &str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ServiceError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(Some(require_text(field, &v, max)?)),
        _ => Ok(None),
    }
}
