//! `GET /service-info` (GA4GH service-info) and `GET /healthz`. Both are
//! always anonymous and uncached; neither consults the policy engine.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceType {
    pub group: &'static str,
    pub artifact: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub description: &'static str,
    pub organization: ServiceOrganization,
    pub version: &'static str,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceOrganization {
    pub name: &'static str,
    pub url: &'static str,
}

pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        id: "org.bentoplatform.authz",
        name: "bento-authz",
        service_type: ServiceType {
            group: "org.ga4gh",
            artifact: "service-info",
            version: "1.0.0",
        },
        description: "policy decision point for grant- and group-based authorization",
        organization: ServiceOrganization { name: "Bento", url: "https://bentoplatform.ca" },
        version: env!("CARGO_PKG_VERSION"),
        url: state.config.service_url.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let ok = state.store.healthy().await;
    let status = if ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(HealthResponse { ok }))
}
