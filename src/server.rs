use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::QueryExecutor;
use crate::handlers;
use crate::middleware::{basic_auth_middleware, rate_limit_middleware, Credentials, RateLimiter};
use crate::services::{SqlPlayground, TableService};

/// Everything a request handler needs; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub executor: Arc<dyn QueryExecutor>,
    pub tables: TableService,
    pub playground: SqlPlayground,
    pub credentials: Option<Credentials>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig, executor: Arc<dyn QueryExecutor>) -> Self {
        let tables = TableService::new(executor.clone(), config.database.schema.clone());
        let playground = SqlPlayground::new(executor.clone());
        let credentials = Credentials::from_config(&config.security);
        let rate_limiter = Arc::new(RateLimiter::new(
            config.api.rate_limit_requests,
            Duration::from_secs(config.api.rate_limit_window_secs),
        ));

        Self {
            config: Arc::new(config),
            executor,
            tables,
            playground,
            credentials,
            rate_limiter,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Gated API
        .merge(api_routes(state.clone()))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&state.config) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    use handlers::{elevated, protected};

    Router::new()
        // Static segments win over `/api/:table`
        .route("/api/tables", get(protected::tables::list))
        .route("/api/sql-playground", post(elevated::sql_playground::execute))
        .route("/api/create-table", post(elevated::create_table::create))
        .route(
            "/api/:table",
            get(protected::data::table_get).post(protected::data::table_post),
        )
        .route(
            "/api/:table/:id",
            put(protected::data::record_put).delete(protected::data::record_delete),
        )
        .layer(from_fn_with_state(state.clone(), basic_auth_middleware))
        .layer(from_fn_with_state(state, rate_limit_middleware))
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }
    if config.is_development() || config.security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect::<Vec<_>>();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
