//! `POST /policy/evaluate`, `/policy/evaluate_one`, `/policy/permissions`.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use validator::Validate;

use crate::errors::{ApiError, Result};
use crate::model::Permission;

use super::dto::{
    EvaluateOneRequest, EvaluateOneResponse, EvaluateRequest, EvaluateResponse,
    PermissionsRequest, PermissionsResponse,
};
use super::extract::CurrentSubject;
use super::AppState;

pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    CurrentSubject(subject): CurrentSubject,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>> {
    req.validate().map_err(ApiError::validation)?;
    let permissions: Vec<Permission> =
        req.permissions.iter().map(|p| Permission::from(p.as_str())).collect();

    let result = state.policy.evaluate(&subject, &req.resources, &permissions).await?;
    Ok(Json(EvaluateResponse { result }))
}

pub async fn evaluate_one(
    State(state): State<Arc<AppState>>,
    CurrentSubject(subject): CurrentSubject,
    Json(req): Json<EvaluateOneRequest>,
) -> Result<Json<EvaluateOneResponse>> {
    let permission = Permission::from(req.permission.as_str());
    let result = state.policy.evaluate_one(&subject, &req.resource, &permission).await?;
    Ok(Json(EvaluateOneResponse { result }))
}

pub async fn permissions(
    State(state): State<Arc<AppState>>,
    CurrentSubject(subject): CurrentSubject,
    Json(req): Json<PermissionsRequest>,
) -> Result<Json<PermissionsResponse>> {
    req.validate().map_err(ApiError::validation)?;
    let sets = state.policy.permissions_for(&subject, &req.resources).await?;
    let result = sets
        .into_iter()
        .map(|set| set.into_iter().map(|p| p.as_str().to_string()).collect())
        .collect();
    Ok(Json(PermissionsResponse { result }))
}
