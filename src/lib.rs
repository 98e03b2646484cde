use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use ipnet::IpNet;

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod provider;
pub mod systemd_client;

use domain::facade::QueryFacade;

#[derive(Clone)]
pub struct AppState {
    pub api_token: Arc<str>,
    pub allowed_cidr: Option<IpNet>,
    pub adapter: Arc<QueryFacade>,
}

impl AppState {
    pub fn new(api_token: String, allowed_cidr: Option<IpNet>, adapter: QueryFacade) -> Self {
        Self {
            api_token: Arc::<str>::from(api_token),
            allowed_cidr,
            adapter: Arc::new(adapter),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/mcp", post(http::handlers::mcp_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer_token,
        ));

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::enforce_ip_allowlist,
        ))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
