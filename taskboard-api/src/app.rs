/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskboard_shared::{
    auth::{jwt, middleware::{bearer_token, AuthContext}},
    models::revoked_token::RevokedToken,
    notify::{Notifier, OutboxNotifier},
    services::{
        comments::CommentService, members::MemberService, projects::ProjectService,
        tasks::TaskService,
    },
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, Level};

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    /// Receives task assignment events
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// State backed by the notification outbox on `db`
    pub fn new(db: PgPool, config: Config) -> Self {
        let notifier = Arc::new(OutboxNotifier::new(db.clone()));
        Self::with_notifier(db, config, notifier)
    }

    pub fn with_notifier(db: PgPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            notifier,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn projects(&self) -> ProjectService {
        ProjectService::new(self.db.clone())
    }

    pub fn members(&self) -> MemberService {
        MemberService::new(self.db.clone())
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(self.db.clone(), self.notifier.clone())
    }

    pub fn comments(&self) -> CommentService {
        CommentService::new(self.db.clone())
    }
}

/// Builds the complete router
///
/// ```text
/// /health                                   public
/// /v1/auth/{register,signup,login,refresh}  public
/// /v1/auth/{logout,me,change-password}      JWT
/// /v1/users                                 JWT
/// /v1/projects[/:id[/members[/:user_id]]]   JWT
/// /v1/tasks[/:id[/status|/assign|/comments]] JWT
/// /v1/comments/:id                          JWT
/// ```
///
/// Layers, outermost first: security headers, CORS, request tracing.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{auth, comments, health, members, projects, tasks, users};

    let public_auth = Router::new()
        .route("/register", post(auth::register))
        .route("/signup", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh));

    let session_auth = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/change-password", post(auth::change_password))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/me", patch(users::update_me))
        .route("/:id", get(users::get_user));

    let project_routes = Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/:id/members",
            get(members::list_members).post(members::add_member),
        )
        .route(
            "/:id/members/:user_id",
            patch(members::change_member_role).delete(members::remove_member),
        );

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/:id/status", patch(tasks::update_status))
        .route("/:id/assign", patch(tasks::assign_task))
        .route(
            "/:id/comments",
            get(comments::list_comments).post(comments::create_comment),
        );

    let comment_routes = Router::new().route(
        "/:id",
        get(comments::get_comment)
            .put(comments::update_comment)
            .delete(comments::delete_comment),
    );

    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new()
        .nest("/auth", public_auth.merge(session_auth))
        .merge(protected);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Authenticates the request from its bearer token
///
/// Rejects missing, malformed, expired, refresh-type and revoked tokens with
/// 401, then makes an [`AuthContext`] available to handlers.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;
    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    if RevokedToken::is_revoked(&state.db, claims.jti).await? {
        debug!(jti = %claims.jti, "Rejected revoked token");
        return Err(ApiError::Unauthorized("Token has been revoked".to_string()));
    }

    req.extensions_mut().insert(AuthContext::from_claims(&claims));

    Ok(next.run(req).await)
}
