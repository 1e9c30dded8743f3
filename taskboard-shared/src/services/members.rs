/// Project membership lifecycle
///
/// Role changes and removals lock the project's admin rows for the duration
/// of the transaction and read the actor's role after taking the lock, so
/// neither the admin count nor the actor's own standing can change underneath
/// them.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::ServiceError;
use crate::auth::authorization::{self, ProjectAction};
use crate::models::project_member::{MemberDetail, ProjectMember, ProjectRole};
use crate::models::user::User;

#[derive(Debug, Clone)]
pub struct MemberService {
    pool: PgPool,
}

fn not_a_member() -> ServiceError {
    ServiceError::NotFound("User is not a member of this project".to_string())
}

impl MemberService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Members of a project; the actor must be one of them
    pub async fn list(
        &self,
        actor: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<MemberDetail>, ServiceError> {
        if !ProjectMember::is_member(&self.pool, project_id, actor).await? {
            return Err(ServiceError::NotFound("Project not found".to_string()));
        }

        Ok(ProjectMember::list_by_project(&self.pool, project_id).await?)
    }

    /// Adds `user_id` to the project with `role`; admin only
    ///
    /// The user must exist and must not already be a member.
    pub async fn add(
        &self,
        actor: Uuid,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<ProjectMember, ServiceError> {
        authorization::require_role(&self.pool, project_id, actor, ProjectAction::AddMember)
            .await?;

        if !User::exists(&self.pool, user_id).await? {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }

        if ProjectMember::is_member(&self.pool, project_id, user_id).await? {
            return Err(ServiceError::Validation(
                "User is already a member of this project".to_string(),
            ));
        }

        let member = ProjectMember::create(&self.pool, project_id, user_id, role).await?;

        info!(
            project_id = %project_id,
            user_id = %user_id,
            role = %role,
            added_by = %actor,
            "Member added"
        );
        Ok(member)
    }

    /// Changes a member's role; admin only, and never demotes the last admin
    pub async fn change_role(
        &self,
        actor: Uuid,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<ProjectMember, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let admin_count = ProjectMember::lock_admin_count(&mut *tx, project_id).await?;
        let actor_role = ProjectMember::get_role(&mut *tx, project_id, actor).await?;
        authorization::check(project_id, actor_role, ProjectAction::ChangeMemberRole)?;

        let current = ProjectMember::get_role(&mut *tx, project_id, user_id)
            .await?
            .ok_or_else(not_a_member)?;

        authorization::check_role_change(current, role, admin_count)?;

        let member = ProjectMember::update_role(&mut *tx, project_id, user_id, role)
            .await?
            .ok_or_else(not_a_member)?;

        tx.commit().await?;

        info!(
            project_id = %project_id,
            user_id = %user_id,
            from = %current,
            to = %role,
            "Member role changed"
        );
        Ok(member)
    }

    /// Removes `user_id` from the project
    ///
    /// Admins may remove anyone; other members may only remove themselves. An
    /// admin may not remove themself while they are the only admin.
    pub async fn remove(
        &self,
        actor: Uuid,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        let admin_count = ProjectMember::lock_admin_count(&mut *tx, project_id).await?;
        let actor_role = ProjectMember::get_role(&mut *tx, project_id, actor).await?;

        authorization::check_member_removal(project_id, actor, actor_role, user_id, admin_count)?;

        if !ProjectMember::delete(&mut *tx, project_id, user_id).await? {
            return Err(not_a_member());
        }

        tx.commit().await?;

        info!(
            project_id = %project_id,
            user_id = %user_id,
            removed_by = %actor,
            "Member removed"
        );
        Ok(())
    }
}
