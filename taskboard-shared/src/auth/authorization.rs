/// Project-scoped authorization rules
///
/// There is no global permission system: every decision is derived from the
/// actor's membership row on the project that owns the target resource.
///
/// # Permission Model
///
/// | Operation | Requirement |
/// |---|---|
/// | View project, list members, view/list/create/update tasks, comment | any membership |
/// | Update or delete project, add member, change a member's role | `admin` |
/// | Remove member | `admin`, or the member removing themself |
/// | Delete task | `admin` or `manager` |
/// | Edit comment | the comment's author |
/// | Delete comment | the author, or `admin`/`manager` |
///
/// A project must always keep at least one admin: the last admin can neither
/// remove themself nor be demoted.
///
/// The rule functions here are pure. [`require_role`] loads the actor's role
/// and applies them.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::{require_role, ProjectAction};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// require_role(&pool, project_id, user_id, ProjectAction::DeleteTask).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::project_member::{ProjectMember, ProjectRole};

/// Why an operation was refused
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Actor holds no membership on the project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),

    /// Actor's role does not allow the action
    #[error("Insufficient permissions: {action} requires {required}, has {actual}")]
    InsufficientRole {
        action: ProjectAction,
        required: &'static str,
        actual: ProjectRole,
    },

    /// The change would leave the project without an admin
    #[error("Cannot remove or demote the only admin. Promote another admin first.")]
    LastAdmin,

    /// Only the author may edit a comment
    #[error("Only the author can edit this comment")]
    NotAuthor,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Operations gated on a project role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    ViewProject,
    UpdateProject,
    DeleteProject,
    ListMembers,
    AddMember,
    ChangeMemberRole,
    RemoveOtherMember,
    CreateTask,
    ViewTask,
    UpdateTask,
    DeleteTask,
    Comment,
    ModerateComment,
}

impl ProjectAction {
    /// Whether `role` may perform this action
    pub fn allows(&self, role: ProjectRole) -> bool {
        match self {
            ProjectAction::ViewProject
            | ProjectAction::ListMembers
            | ProjectAction::CreateTask
            | ProjectAction::ViewTask
            | ProjectAction::UpdateTask
            | ProjectAction::Comment => true,

            ProjectAction::UpdateProject
            | ProjectAction::DeleteProject
            | ProjectAction::AddMember
            | ProjectAction::ChangeMemberRole
            | ProjectAction::RemoveOtherMember => role == ProjectRole::Admin,

            ProjectAction::DeleteTask | ProjectAction::ModerateComment => role.is_elevated(),
        }
    }

    /// Human-readable requirement, used in error messages
    pub fn requirement(&self) -> &'static str {
        match self {
            ProjectAction::UpdateProject
            | ProjectAction::DeleteProject
            | ProjectAction::AddMember
            | ProjectAction::ChangeMemberRole
            | ProjectAction::RemoveOtherMember => "admin",
            ProjectAction::DeleteTask | ProjectAction::ModerateComment => "admin or manager",
            _ => "membership",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectAction::ViewProject => "view project",
            ProjectAction::UpdateProject => "update project",
            ProjectAction::DeleteProject => "delete project",
            ProjectAction::ListMembers => "list members",
            ProjectAction::AddMember => "add member",
            ProjectAction::ChangeMemberRole => "change member role",
            ProjectAction::RemoveOtherMember => "remove member",
            ProjectAction::CreateTask => "create task",
            ProjectAction::ViewTask => "view task",
            ProjectAction::UpdateTask => "update task",
            ProjectAction::DeleteTask => "delete task",
            ProjectAction::Comment => "comment",
            ProjectAction::ModerateComment => "delete comment",
        }
    }
}

impl std::fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks `action` against an already-loaded role
pub fn check(
    project_id: Uuid,
    role: Option<ProjectRole>,
    action: ProjectAction,
) -> Result<ProjectRole, AuthzError> {
    let role = role.ok_or(AuthzError::NotMember(project_id))?;

    if !action.allows(role) {
        return Err(AuthzError::InsufficientRole {
            action,
            required: action.requirement(),
            actual: role,
        });
    }

    Ok(role)
}

/// Decides whether `actor` may remove `target` from a project
///
/// `admin_count` is the number of admins before the removal. Non-admins may
/// only remove themselves. An admin removing themself needs another admin to
/// remain.
pub fn check_member_removal(
    project_id: Uuid,
    actor_id: Uuid,
    actor_role: Option<ProjectRole>,
    target_id: Uuid,
    admin_count: i64,
) -> Result<(), AuthzError> {
    let removing_self = actor_id == target_id;
    let actor_is_admin = actor_role == Some(ProjectRole::Admin);

    if !actor_is_admin && !removing_self {
        return match actor_role {
            None => Err(AuthzError::NotMember(project_id)),
            Some(actual) => Err(AuthzError::InsufficientRole {
                action: ProjectAction::RemoveOtherMember,
                required: ProjectAction::RemoveOtherMember.requirement(),
                actual,
            }),
        };
    }

    if actor_is_admin && removing_self && admin_count <= 1 {
        return Err(AuthzError::LastAdmin);
    }

    Ok(())
}

/// Decides whether a member's role may change from `current` to `new`
///
/// Refuses to demote the last admin. `admin_count` is the number of admins
/// before the change.
pub fn check_role_change(
    current: ProjectRole,
    new: ProjectRole,
    admin_count: i64,
) -> Result<(), AuthzError> {
    if current == ProjectRole::Admin && new != ProjectRole::Admin && admin_count <= 1 {
        return Err(AuthzError::LastAdmin);
    }
    Ok(())
}

/// Only the author may edit a comment
pub fn check_comment_edit(actor_id: Uuid, author_id: Uuid) -> Result<(), AuthzError> {
    if actor_id != author_id {
        return Err(AuthzError::NotAuthor);
    }
    Ok(())
}

/// The author, or an elevated member of the project, may delete a comment
pub fn check_comment_delete(
    project_id: Uuid,
    actor_id: Uuid,
    actor_role: Option<ProjectRole>,
    author_id: Uuid,
) -> Result<(), AuthzError> {
    if actor_id == author_id {
        return Ok(());
    }
    check(project_id, actor_role, ProjectAction::ModerateComment).map(|_| ())
}

/// Requires `user_id`'s role on `project_id` to allow `action`
pub async fn require_role(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
    action: ProjectAction,
) -> Result<ProjectRole, AuthzError> {
    let role = ProjectMember::get_role(pool, project_id, user_id).await?;
    check(project_id, role, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [ProjectRole; 3] =
        [ProjectRole::Admin, ProjectRole::Manager, ProjectRole::Member];

    #[test]
    fn test_any_member_may_view_and_work_on_tasks() {
        for role in ALL_ROLES {
            for action in [
                ProjectAction::ViewProject,
                ProjectAction::ListMembers,
                ProjectAction::CreateTask,
                ProjectAction::ViewTask,
                ProjectAction::UpdateTask,
                ProjectAction::Comment,
            ] {
                assert!(action.allows(role), "{} should allow {}", role, action);
            }
        }
    }

    #[test]
    fn test_admin_only_actions() {
        for action in [
            ProjectAction::UpdateProject,
            ProjectAction::DeleteProject,
            ProjectAction::AddMember,
            ProjectAction::ChangeMemberRole,
            ProjectAction::RemoveOtherMember,
        ] {
            assert!(action.allows(ProjectRole::Admin));
            assert!(!action.allows(ProjectRole::Manager));
            assert!(!action.allows(ProjectRole::Member));
        }
    }

    #[test]
    fn test_delete_task_requires_admin_or_manager() {
        assert!(ProjectAction::DeleteTask.allows(ProjectRole::Admin));
        assert!(ProjectAction::DeleteTask.allows(ProjectRole::Manager));
        assert!(!ProjectAction::DeleteTask.allows(ProjectRole::Member));
    }

    #[test]
    fn test_check_without_membership() {
        let project_id = Uuid::new_v4();
        let err = check(project_id, None, ProjectAction::ViewProject).unwrap_err();
        assert!(matches!(err, AuthzError::NotMember(id) if id == project_id));
    }

    #[test]
    fn test_check_insufficient_role() {
        let err = check(
            Uuid::new_v4(),
            Some(ProjectRole::Member),
            ProjectAction::DeleteProject,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            AuthzError::InsufficientRole {
                actual: ProjectRole::Member,
                ..
            }
        ));
    }

    #[test]
    fn test_last_admin_cannot_remove_self() {
        let project = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let err =
            check_member_removal(project, admin, Some(ProjectRole::Admin), admin, 1).unwrap_err();
        assert!(matches!(err, AuthzError::LastAdmin));

        assert!(check_member_removal(project, admin, Some(ProjectRole::Admin), admin, 2).is_ok());
    }

    #[test]
    fn test_admin_may_remove_others() {
        let project = Uuid::new_v4();
        assert!(check_member_removal(
            project,
            Uuid::new_v4(),
            Some(ProjectRole::Admin),
            Uuid::new_v4(),
            1
        )
        .is_ok());
    }

    #[test]
    fn test_non_admin_may_only_remove_self() {
        let project = Uuid::new_v4();
        let me = Uuid::new_v4();

        for role in [ProjectRole::Manager, ProjectRole::Member] {
            assert!(check_member_removal(project, me, Some(role), me, 1).is_ok());
            assert!(matches!(
                check_member_removal(project, me, Some(role), Uuid::new_v4(), 1),
                Err(AuthzError::InsufficientRole { .. })
            ));
        }

        assert!(matches!(
            check_member_removal(project, me, None, Uuid::new_v4(), 1),
            Err(AuthzError::NotMember(_))
        ));
    }

    #[test]
    fn test_last_admin_cannot_be_demoted() {
        assert!(matches!(
            check_role_change(ProjectRole::Admin, ProjectRole::Member, 1),
            Err(AuthzError::LastAdmin)
        ));
        assert!(check_role_change(ProjectRole::Admin, ProjectRole::Member, 2).is_ok());
        assert!(check_role_change(ProjectRole::Admin, ProjectRole::Admin, 1).is_ok());
        assert!(check_role_change(ProjectRole::Member, ProjectRole::Manager, 1).is_ok());
    }

    #[test]
    fn test_comment_rules() {
        let project = Uuid::new_v4();
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(check_comment_edit(author, author).is_ok());
        assert!(matches!(
            check_comment_edit(other, author),
            Err(AuthzError::NotAuthor)
        ));

        assert!(check_comment_delete(project, author, Some(ProjectRole::Member), author).is_ok());
        assert!(check_comment_delete(project, other, Some(ProjectRole::Manager), author).is_ok());
        assert!(check_comment_delete(project, other, Some(ProjectRole::Member), author).is_err());
    }
}
