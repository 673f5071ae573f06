//! HTTP surface: router assembly and shared application state.

pub mod dto;
pub mod extract;
pub mod grants;
pub mod groups;
pub mod policy;
pub mod registry;
pub mod service_info;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::errors::{ApiError, Result};
use crate::model::{Permission, ResolvedSubject};
use crate::policy::PolicyEngine;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub verifier: TokenVerifier,
    pub policy: PolicyEngine,
    pub config: Config,
}

/// `edit:permissions` and `edit:groups` are administrative permissions whose
/// minimum specificity is `Everything`, so holding either on any concrete
/// resource implies holding it globally. A fixed sentinel resource is enough
/// to probe for that: a grant scoped narrower than `Everything` wouldn't be
/// a legitimate administrative grant in the first place.
const ADMIN_PROBE_PROJECT: &str = "__admin_probe__";

fn admin_probe_resource() -> crate::model::Resource {
    crate::model::Resource::Project { project_id: ADMIN_PROBE_PROJECT.to_string() }
}

async fn require_permission(
    state: &AppState,
    subject: &ResolvedSubject,
    permission: &str,
) -> Result<()> {
    let allow = state
        .policy
        .evaluate_one(subject, &admin_probe_resource(), &Permission::from(permission))
        .await?;
    if allow {
        Ok(())
    } else {
        Err(ApiError::InsufficientPermissionsError)
    }
}

pub async fn require_edit_permissions(state: &AppState, subject: &ResolvedSubject) -> Result<()> {
    require_permission(state, subject, "edit:permissions").await
}

pub async fn require_edit_groups(state: &AppState, subject: &ResolvedSubject) -> Result<()> {
    require_permission(state, subject, "edit:groups").await
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = if state.config.cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = state
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    Router::new()
        .route("/healthz", get(service_info::healthz))
        .route("/service-info", get(service_info::service_info))
        .route("/all_permissions", get(registry::all_permissions))
        .route("/policy/evaluate", post(policy::evaluate))
        .route("/policy/evaluate_one", post(policy::evaluate_one))
        .route("/policy/permissions", post(policy::permissions))
        .route("/grants", get(grants::list).post(grants::create))
        .route("/grants/:id", get(grants::get).delete(grants::delete))
        .route("/groups", get(groups::list).post(groups::create))
        .route(
            "/groups/:id",
            get(groups::get).put(groups::update).delete(groups::delete),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(state.config.request_timeout.max(Duration::from_secs(1))))
        .layer(cors)
        .with_state(state)
}
