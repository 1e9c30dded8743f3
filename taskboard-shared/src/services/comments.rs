/// Comment lifecycle
///
/// Access follows the task's project: members of that project can read and
/// post comments. Only the author may edit a comment; the author or a project
/// admin/manager may delete it.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{require_text, ServiceError};
use crate::auth::authorization;
use crate::models::comment::{Comment, CommentScope, CommentWithAuthor};
use crate::models::project_member::{ProjectMember, ProjectRole};
use crate::models::task::Task;

const MAX_CONTENT_LEN: usize = 5000;

#[derive(Debug, Clone)]
pub struct CommentService {
    pool: PgPool,
}

fn comment_not_found() -> ServiceError {
    ServiceError::NotFound("Comment not found".to_string())
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Comments on a task visible to the actor, oldest first
    pub async fn list(
        &self,
        actor: Uuid,
        task_id: Uuid,
    ) -> Result<Vec<CommentWithAuthor>, ServiceError> {
        self.visible_task(actor, task_id).await?;
        Ok(Comment::list_by_task(&self.pool, task_id).await?)
    }

    pub async fn create(
        &self,
        actor: Uuid,
        task_id: Uuid,
        content: &str,
    ) -> Result<Comment, ServiceError> {
        let content = require_text("Content", content, MAX_CONTENT_LEN)?;
        self.visible_task(actor, task_id).await?;

        let comment = Comment::create(&self.pool, task_id, actor, &content).await?;

        info!(comment_id = %comment.id, task_id = %task_id, user_id = %actor, "Comment added");
        Ok(comment)
    }

    pub async fn get(&self, actor: Uuid, comment_id: Uuid) -> Result<Comment, ServiceError> {
        let (scope, _) = self.visible_comment(actor, comment_id).await?;
        Ok(scope.comment)
    }

    /// Replaces the content of the actor's own comment
    pub async fn update(
        &self,
        actor: Uuid,
        comment_id: Uuid,
        content: &str,
    ) -> Result<Comment, ServiceError> {
        let content = require_text("Content", content, MAX_CONTENT_LEN)?;
        let (scope, _) = self.visible_comment(actor, comment_id).await?;

        authorization::check_comment_edit(actor, scope.comment.author_id)?;

        Comment::update_content(&self.pool, comment_id, &content)
            .await?
            .ok_or_else(comment_not_found)
    }

    pub async fn delete(&self, actor: Uuid, comment_id: Uuid) -> Result<(), ServiceError> {
        let (scope, role) = self.visible_comment(actor, comment_id).await?;

        authorization::check_comment_delete(
            scope.project_id,
            actor,
            Some(role),
            scope.comment.author_id,
        )?;

        if !Comment::delete(&self.pool, comment_id).await? {
            return Err(comment_not_found());
        }

        info!(comment_id = %comment_id, user_id = %actor, "Comment deleted");
        Ok(())
    }

    async fn visible_task(&self, actor: Uuid, task_id: Uuid) -> Result<Task, ServiceError> {
        Task::find_visible(&self.pool, task_id, actor)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))
    }

    async fn visible_comment(
        &self,
        actor: Uuid,
        comment_id: Uuid,
    ) -> Result<(CommentScope, ProjectRole), ServiceError> {
        let scope = Comment::find_with_scope(&self.pool, comment_id)
            .await?
            .ok_or_else(comment_not_found)?;

        let role = ProjectMember::get_role(&self.pool, scope.project_id, actor)
            .await?
            .ok_or_else(comment_not_found)?;

        Ok((scope, role))
    }
}
