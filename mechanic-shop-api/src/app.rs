/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use mechanic_shop_api::{app::{build_router, AppState}, config::Config};
/// use mechanic_shop_shared::store::memory::InMemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(InMemoryStore::new()), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    Router,
};
use mechanic_shop_shared::{
    association::AssociationEngine,
    auth::middleware::authenticate,
    policy::{RateLimiter, ResponseCache},
    resources::{ResourceService, TokenSettings},
    store::ResourceStore,
    workload::WorkloadAggregator,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. The
/// limiter counters and cache entries are shared between clones.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    pub store: Arc<dyn ResourceStore>,

    pub resources: ResourceService,

    pub engine: AssociationEngine,

    pub workload: WorkloadAggregator,

    pub limiter: Arc<RateLimiter>,

    /// Response cache in front of the ticket list
    pub cache: ResponseCache,
}

impl AppState {
    /// Creates new application state on top of a store
    pub fn new(store: Arc<dyn ResourceStore>, config: Config) -> Self {
        let tokens = TokenSettings {
            secret: config.jwt.secret.clone(),
            ttl_seconds: config.jwt.ttl_seconds,
        };

        Self {
            resources: ResourceService::new(store.clone(), tokens),
            engine: AssociationEngine::new(store.clone()),
            workload: WorkloadAggregator::new(store.clone()),
            limiter: Arc::new(RateLimiter::new()),
            cache: ResponseCache::new(config.policy.ticket_list_ttl),
            config: Arc::new(config),
            store,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health
/// ├── /customers                          CRUD, POST /customers/login
/// ├── /mechanics                          CRUD, GET /mechanics/most-worked
/// ├── /inventory                          CRUD
/// └── /service-tickets                    CRUD (list cached)
///     ├── GET /my-tickets                 bearer token
///     ├── PUT /:ticket_id/assign-mechanic/:mechanic_id
///     ├── PUT /:ticket_id/remove-mechanic/:mechanic_id
///     ├── PUT /:ticket_id/edit
///     └── PUT /add-part/:item_id/to-ticket/:ticket_id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Rate limiting and authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
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
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(routes::health::router())
        .merge(routes::customers::router(&state))
        .merge(routes::mechanics::router())
        .merge(routes::items::router())
        .merge(routes::service_tickets::router(&state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer-token authentication middleware
///
/// Validates the token from the Authorization header and inserts the
/// caller's `CustomerIdentity` into request extensions.
pub async fn customer_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(req.headers(), state.jwt_secret()).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
