use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use crate::{
    config::Config,
    handlers,
    middleware,
    repositories::{TaskRepository, TokenRepository, UserRepository},
    services::{AuthService, TaskService},
};

// Application state that can be shared between handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub tasks: Arc<TaskService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services onto one storage backend.
    pub fn new<R>(repository: R, config: Config) -> Self
    where
        R: UserRepository + TaskRepository + TokenRepository + 'static,
    {
        let repository = Arc::new(repository);
        let users: Arc<dyn UserRepository> = repository.clone();
        let tokens: Arc<dyn TokenRepository> = repository.clone();
        let tasks: Arc<dyn TaskRepository> = repository;

        Self {
            auth: Arc::new(AuthService::new(users, tokens, config.auth.clone())),
            tasks: Arc::new(TaskService::new(tasks)),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_body_size;

    let access = || from_fn_with_state(state.clone(), middleware::require_access_token);

    let auth_routes = Router::new()
        .route("/logout", post(handlers::logout))
        .route("/change-password", put(handlers::change_password))
        .route("/profile", get(handlers::profile))
        .route_layer(access())
        .merge(
            Router::new()
                .route("/refresh-token", post(handlers::refresh_token))
                .route_layer(from_fn_with_state(state.clone(), middleware::require_refresh_token)),
        )
        // Public
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let task_routes = Router::new()
        .route("/", post(handlers::create_task))
        .route("/mine", get(handlers::list_my_tasks))
        .route("/category/:name", get(handlers::list_tasks_by_category))
        .route("/mine/category/:name", get(handlers::list_my_tasks_by_category))
        .route(
            "/:id",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/:id/complete", patch(handlers::complete_task))
        .route_layer(access());

    // Unmatched paths fall through to 404 without an auth check
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/auth", auth_routes)
        .nest("/task", task_routes)
        .layer(TraceLayer::new_for_http())

        // Request body limit from config
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))

        .with_state(state)
}
