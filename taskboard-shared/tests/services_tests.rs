//! Integration tests for the lifecycle services
//!
//! Require PostgreSQL via `DATABASE_URL`; each test skips itself otherwise.
//! Every test creates its own users and projects, so they can share one
//! database and run in parallel.

mod common;

use std::sync::Arc;

use common::{create_user, test_pool, FailingNotifier, RecordingNotifier};
use taskboard_shared::models::notification::{Notification, NotificationStatus};
use taskboard_shared::models::project::UpdateProject;
use taskboard_shared::models::project_member::{ProjectMember, ProjectRole};
use taskboard_shared::models::task::{Task, TaskFilter, UpdateTask};
use taskboard_shared::notify::{OutboxNotifier, TASK_ASSIGNED};
use taskboard_shared::services::comments::CommentService;
use taskboard_shared::services::members::MemberService;
use taskboard_shared::services::projects::{NewProject, ProjectService};
use taskboard_shared::services::tasks::{NewTask, TaskService};
use taskboard_shared::services::ServiceError;
use uuid::Uuid;

fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        ..Default::default()
    }
}

fn new_task(project_id: Uuid, title: &str, assignee_id: Option<Uuid>) -> NewTask {
    NewTask {
        project_id,
        title: title.to_string(),
        description: None,
        status: None,
        priority: None,
        due_date: None,
        assignee_id,
    }
}

#[tokio::test]
async fn test_creator_becomes_admin() {
    let Some(pool) = test_pool().await else { return };
    let alice = create_user(&pool, "Alice").await;

    let created = ProjectService::new(pool.clone())
        .create(alice.id, new_project("Apollo"))
        .await
        .unwrap();

    assert_eq!(created.role, ProjectRole::Admin);
    assert_eq!(created.project.status, "active");
    assert_eq!(created.project.manager_id, alice.id);

    let role = ProjectMember::get_role(&pool, created.project.id, alice.id)
        .await
        .unwrap();
    assert_eq!(role, Some(ProjectRole::Admin));
}

#[tokio::test]
async fn test_failed_membership_insert_rolls_back_project() {
    let Some(pool) = test_pool().await else { return };
    let alice = create_user(&pool, "Alice").await;

    // Reject only Alice's memberships so parallel tests are unaffected
    let tag = alice.id.simple();
    sqlx::query(&format!(
        "CREATE FUNCTION reject_membership_{tag}() RETURNS trigger LANGUAGE plpgsql AS \
         $$ BEGIN RAISE EXCEPTION 'membership rejected'; END $$"
    ))
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(&format!(
        "CREATE TRIGGER reject_membership_{tag} BEFORE INSERT ON project_members \
         FOR EACH ROW WHEN (NEW.user_id = '{}') EXECUTE FUNCTION reject_membership_{tag}()",
        alice.id
    ))
    .execute(&pool)
    .await
    .unwrap();

    let result = ProjectService::new(pool.clone())
        .create(alice.id, new_project("Orphan"))
        .await;

    sqlx::query(&format!("DROP TRIGGER reject_membership_{tag} ON project_members"))
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(&format!("DROP FUNCTION reject_membership_{tag}()"))
        .execute(&pool)
        .await
        .unwrap();

    assert!(matches!(result, Err(ServiceError::Database(_))));

    let projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE manager_id = $1")
        .bind(alice.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(projects, 0);
}

#[tokio::test]
async fn test_create_project_requires_name() {
    let Some(pool) = test_pool().await else { return };
    let alice = create_user(&pool, "Alice").await;

    let result = ProjectService::new(pool.clone())
        .create(alice.id, new_project("   "))
        .await;

    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_project_visible_only_to_members() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let project = projects.create(alice.id, new_project("Apollo")).await.unwrap();
    let id = project.project.id;

    assert!(projects.get(alice.id, id).await.is_ok());
    assert!(matches!(
        projects.get(bob.id, id).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(projects.list(bob.id).await.unwrap().is_empty());

    members
        .add(alice.id, id, bob.id, ProjectRole::Member)
        .await
        .unwrap();

    let seen = projects.get(bob.id, id).await.unwrap();
    assert_eq!(seen.role, ProjectRole::Member);
    assert_eq!(projects.list(bob.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_only_admins_update_project() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let carol = create_user(&pool, "Carol").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Manager).await.unwrap();

    let rename = || UpdateProject {
        name: Some("Artemis".to_string()),
        ..Default::default()
    };

    assert!(matches!(
        projects.update(bob.id, id, rename()).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        projects.update(carol.id, id, rename()).await,
        Err(ServiceError::Forbidden(_))
    ));

    let updated = projects.update(alice.id, id, rename()).await.unwrap();
    assert_eq!(updated.project.name, "Artemis");
}

#[tokio::test]
async fn test_delete_project_cascades() {
    let Some(pool) = test_pool().await else { return };
    let notifier = Arc::new(RecordingNotifier::default());
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());
    let tasks = TaskService::new(pool.clone(), notifier);
    let comments = CommentService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();
    let task = tasks.create(alice.id, new_task(id, "Launch", Some(bob.id))).await.unwrap();
    comments.create(bob.id, task.id, "On it").await.unwrap();

    assert!(matches!(
        projects.delete(bob.id, id).await,
        Err(ServiceError::Forbidden(_))
    ));

    projects.delete(alice.id, id).await.unwrap();

    assert_eq!(Task::count_by_project(&pool, id).await.unwrap(), 0);
    assert!(Task::find_by_id(&pool, task.id).await.unwrap().is_none());
    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM project_members WHERE project_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);

    assert!(matches!(
        projects.get(alice.id, id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_add_member_rules() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let carol = create_user(&pool, "Carol").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;

    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();

    // Duplicate membership is a validation failure
    assert!(matches!(
        members.add(alice.id, id, bob.id, ProjectRole::Manager).await,
        Err(ServiceError::Validation(_))
    ));

    // Unknown user
    assert!(matches!(
        members.add(alice.id, id, Uuid::new_v4(), ProjectRole::Member).await,
        Err(ServiceError::NotFound(_))
    ));

    // Non-admins cannot add
    assert!(matches!(
        members.add(bob.id, id, carol.id, ProjectRole::Member).await,
        Err(ServiceError::Forbidden(_))
    ));

    let listed = members.list(bob.id, id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].user_id, alice.id);

    assert!(matches!(
        members.list(carol.id, id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_last_admin_cannot_leave() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;

    assert!(matches!(
        members.remove(alice.id, id, alice.id).await,
        Err(ServiceError::Forbidden(_))
    ));

    members.add(alice.id, id, bob.id, ProjectRole::Admin).await.unwrap();
    members.remove(alice.id, id, alice.id).await.unwrap();

    assert!(!ProjectMember::is_member(&pool, id, alice.id).await.unwrap());
    assert_eq!(
        ProjectMember::count_by_role(&pool, id, ProjectRole::Admin).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_remove_member_rules() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let carol = create_user(&pool, "Carol").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();
    members.add(alice.id, id, carol.id, ProjectRole::Manager).await.unwrap();

    // A manager cannot remove someone else
    assert!(matches!(
        members.remove(carol.id, id, bob.id).await,
        Err(ServiceError::Forbidden(_))
    ));

    // Anyone may leave
    members.remove(bob.id, id, bob.id).await.unwrap();

    // Removing a non-member
    assert!(matches!(
        members.remove(alice.id, id, bob.id).await,
        Err(ServiceError::NotFound(_))
    ));

    // Admins can remove others
    members.remove(alice.id, id, carol.id).await.unwrap();
}

#[tokio::test]
async fn test_last_admin_cannot_be_demoted() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();

    assert!(matches!(
        members.change_role(alice.id, id, alice.id, ProjectRole::Member).await,
        Err(ServiceError::Forbidden(_))
    ));

    let promoted = members
        .change_role(alice.id, id, bob.id, ProjectRole::Admin)
        .await
        .unwrap();
    assert_eq!(promoted.role, ProjectRole::Admin);

    members
        .change_role(alice.id, id, alice.id, ProjectRole::Member)
        .await
        .unwrap();

    // Alice is no longer an admin and cannot change roles
    assert!(matches!(
        members.change_role(alice.id, id, bob.id, ProjectRole::Member).await,
        Err(ServiceError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_demoted_admin_cannot_change_roles_after_concurrent_demotion() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let carol = create_user(&pool, "Carol").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Admin).await.unwrap();
    members.add(alice.id, id, carol.id, ProjectRole::Admin).await.unwrap();

    // Alice demotes Bob in a transaction that still holds the admin locks
    let mut tx = pool.begin().await.unwrap();
    assert_eq!(ProjectMember::lock_admin_count(&mut *tx, id).await.unwrap(), 3);
    ProjectMember::update_role(&mut *tx, id, bob.id, ProjectRole::Member)
        .await
        .unwrap();

    let pending = tokio::spawn({
        let members = members.clone();
        let (bob, carol) = (bob.id, carol.id);
        async move { members.change_role(bob, id, carol, ProjectRole::Member).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    tx.commit().await.unwrap();

    assert!(matches!(
        pending.await.unwrap(),
        Err(ServiceError::Forbidden(_))
    ));
    assert_eq!(
        ProjectMember::get_role(&pool, id, carol.id).await.unwrap(),
        Some(ProjectRole::Admin)
    );
    assert_eq!(
        ProjectMember::get_role(&pool, id, bob.id).await.unwrap(),
        Some(ProjectRole::Member)
    );
}

#[tokio::test]
async fn test_assignee_must_be_project_member() {
    let Some(pool) = test_pool().await else { return };
    let notifier = Arc::new(RecordingNotifier::default());
    let projects = ProjectService::new(pool.clone());
    let tasks = TaskService::new(pool.clone(), notifier.clone());

    let alice = create_user(&pool, "Alice").await;
    let outsider = create_user(&pool, "Outsider").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;

    // Even the admin cannot assign to a non-member
    assert!(matches!(
        tasks.create(alice.id, new_task(id, "Launch", Some(outsider.id))).await,
        Err(ServiceError::Validation(_))
    ));

    let task = tasks.create(alice.id, new_task(id, "Launch", None)).await.unwrap();
    assert!(matches!(
        tasks.assign(alice.id, task.id, Some(outsider.id)).await,
        Err(ServiceError::Validation(_))
    ));

    assert!(notifier.recipients().is_empty());
}

#[tokio::test]
async fn test_create_task_in_foreign_project_is_forbidden() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let tasks = TaskService::new(pool.clone(), Arc::new(RecordingNotifier::default()));

    let alice = create_user(&pool, "Alice").await;
    let mallory = create_user(&pool, "Mallory").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;

    assert!(matches!(
        tasks.create(mallory.id, new_task(id, "Sneaky", None)).await,
        Err(ServiceError::Forbidden(_))
    ));

    // A project that does not exist looks the same
    assert!(matches!(
        tasks.create(mallory.id, new_task(Uuid::new_v4(), "Sneaky", None)).await,
        Err(ServiceError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_task_visibility_and_deletion() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());
    let tasks = TaskService::new(pool.clone(), Arc::new(RecordingNotifier::default()));

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let carol = create_user(&pool, "Carol").await;
    let mallory = create_user(&pool, "Mallory").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();
    members.add(alice.id, id, carol.id, ProjectRole::Manager).await.unwrap();

    let task = tasks.create(bob.id, new_task(id, "Launch", None)).await.unwrap();
    assert_eq!(task.status, "todo");

    assert!(matches!(
        tasks.get(mallory.id, task.id).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(tasks.list(mallory.id, &TaskFilter::default()).await.unwrap().is_empty());

    // Any member can move the status
    let moved = tasks.set_status(bob.id, task.id, "in_progress".to_string()).await.unwrap();
    assert_eq!(moved.status, "in_progress");

    let filter = TaskFilter {
        project_id: Some(id),
        status: Some("in_progress".to_string()),
        assignee_id: None,
    };
    assert_eq!(tasks.list(alice.id, &filter).await.unwrap().len(), 1);

    // Members cannot delete, managers can
    assert!(matches!(
        tasks.delete(bob.id, task.id).await,
        Err(ServiceError::Forbidden(_))
    ));
    tasks.delete(carol.id, task.id).await.unwrap();
    assert!(matches!(
        tasks.get(alice.id, task.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_assignment_notifies_assignee() {
    let Some(pool) = test_pool().await else { return };
    let notifier = Arc::new(RecordingNotifier::default());
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());
    let tasks = TaskService::new(pool.clone(), notifier.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();

    // Self-assignment is silent
    let task = tasks.create(alice.id, new_task(id, "Launch", Some(alice.id))).await.unwrap();
    assert!(notifier.recipients().is_empty());

    tasks.assign(alice.id, task.id, Some(bob.id)).await.unwrap();
    assert_eq!(notifier.recipients(), vec![bob.id]);

    // Same assignee again does not notify twice
    tasks
        .update(
            alice.id,
            task.id,
            UpdateTask {
                assignee_id: Some(Some(bob.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(notifier.recipients(), vec![bob.id]);

    let unassigned = tasks.assign(alice.id, task.id, None).await.unwrap();
    assert!(unassigned.assignee_id.is_none());
}

#[tokio::test]
async fn test_notifier_failure_does_not_fail_task_creation() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());
    let tasks = TaskService::new(pool.clone(), Arc::new(FailingNotifier));

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();

    let task = tasks.create(alice.id, new_task(id, "Launch", Some(bob.id))).await.unwrap();
    assert!(Task::find_by_id(&pool, task.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_outbox_notifier_queues_pending_row() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());
    let tasks = TaskService::new(pool.clone(), Arc::new(OutboxNotifier::new(pool.clone())));

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();

    let task = tasks.create(alice.id, new_task(id, "Launch", Some(bob.id))).await.unwrap();

    let queued = Notification::list_for_recipient(&pool, bob.id).await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].kind, TASK_ASSIGNED);
    assert_eq!(queued[0].status, NotificationStatus::Pending);
    assert_eq!(queued[0].payload["task_id"], task.id.to_string());
}

#[tokio::test]
async fn test_comment_permissions() {
    let Some(pool) = test_pool().await else { return };
    let projects = ProjectService::new(pool.clone());
    let members = MemberService::new(pool.clone());
    let tasks = TaskService::new(pool.clone(), Arc::new(RecordingNotifier::default()));
    let comments = CommentService::new(pool.clone());

    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;
    let carol = create_user(&pool, "Carol").await;
    let mallory = create_user(&pool, "Mallory").await;
    let id = projects.create(alice.id, new_project("Apollo")).await.unwrap().project.id;
    members.add(alice.id, id, bob.id, ProjectRole::Member).await.unwrap();
    members.add(alice.id, id, carol.id, ProjectRole::Member).await.unwrap();
    let task = tasks.create(alice.id, new_task(id, "Launch", None)).await.unwrap();

    let comment = comments.create(bob.id, task.id, "First!").await.unwrap();

    assert!(matches!(
        comments.create(mallory.id, task.id, "hi").await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        comments.get(mallory.id, comment.id).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        comments.create(bob.id, task.id, "  ").await,
        Err(ServiceError::Validation(_))
    ));

    // Only the author edits
    assert!(matches!(
        comments.update(carol.id, comment.id, "hijacked").await,
        Err(ServiceError::Forbidden(_))
    ));
    let edited = comments.update(bob.id, comment.id, "First, edited").await.unwrap();
    assert_eq!(edited.content, "First, edited");

    // Plain members cannot delete others' comments, admins can
    assert!(matches!(
        comments.delete(carol.id, comment.id).await,
        Err(ServiceError::Forbidden(_))
    ));
    comments.delete(alice.id, comment.id).await.unwrap();

    assert!(comments.list(bob.id, task.id).await.unwrap().is_empty());
}
