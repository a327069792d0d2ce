/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskassign_api::{app::{build_router, AppState}, config::Config};
/// use taskassign_shared::{notify::LogNotifier, store::InMemoryStore};
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(
///     Arc::new(InMemoryStore::new()),
///     Arc::new(LogNotifier),
///     Arc::new(mockable::DefaultClock),
///     config,
/// )?;
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::security_headers};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use mockable::Clock;
use std::{sync::Arc, time::Instant};
use taskassign_shared::{
    auth::{jwt::TokenIssuer, middleware::bearer_token},
    notify::InviteNotifier,
    services::{AssignmentCoordinator, IdentityManager},
    store::CredentialStore,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler via Axum's `State` extractor; all fields are
/// cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub identity: Arc<IdentityManager>,
    pub assignments: Arc<AssignmentCoordinator>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    /// Wires the services over the given adapters
    ///
    /// # Errors
    ///
    /// Fails when the configured JWT secret is unusable.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn InviteNotifier>,
        clock: Arc<dyn Clock + Send + Sync>,
        config: Config,
    ) -> anyhow::Result<Self> {
        let issuer = TokenIssuer::new(&config.jwt.secret, clock.clone())?;
        let identity = Arc::new(IdentityManager::new(store.clone(), issuer, clock.clone()));
        let assignments = Arc::new(AssignmentCoordinator::new(
            store.clone(),
            identity.clone(),
            notifier,
            clock,
            config.api.public_base_url.clone(),
        ));

        Ok(Self {
            store,
            identity,
            assignments,
            config: Arc::new(config),
            started_at: Instant::now(),
        })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register[?tid=N]
///     │   └── POST /login
///     └── /tasks/                  (bearer token required)
///         ├── POST   /
///         ├── GET    /
///         ├── POST   /assign
///         ├── GET    /:tid
///         ├── PUT    /:tid
///         └── DELETE /:tid
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/assign", post(routes::tasks::assign_task))
        .route(
            "/:tid",
            get(routes::tasks::get_task)
                .put(routes::tasks::edit_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes);

    let cors = cors_layer(&state.config.api.cors_origins);
    let enable_hsts = state.config.api.production;

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            security_headers(enable_hsts, req, next)
        }))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Verifies the bearer token and injects the caller's `Identity` into
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = {
        let token = bearer_token(&req)?;
        state.identity.verify_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?
    };

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
