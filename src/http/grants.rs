//! Grant CRUD. Creation and deletion are restricted to callers holding
//! `edit:permissions` on the `Everything` resource; see [`require_edit_permissions`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::errors::Result;
use crate::model::{GrantId, NewGrant};

use super::dto::{GrantDto, NewGrantRequest};
use super::extract::CurrentSubject;
use super::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<GrantDto>>> {
    let grants = state.store.list_grants().await?;
    Ok(Json(grants.into_iter().map(GrantDto::from).collect()))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<GrantDto>> {
    let grant = state.store.get_grant(GrantId(id)).await?;
    Ok(Json(grant.into()))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentSubject(subject): CurrentSubject,
    Json(req): Json<NewGrantRequest>,
) -> Result<(StatusCode, Json<GrantDto>)> {
    super::require_edit_permissions(&state, &subject).await?;

    let new_grant: NewGrant = req.into();
    new_grant.validate()?;
    let grant = state.store.create_grant(new_grant).await?;
    Ok((StatusCode::CREATED, Json(grant.into())))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentSubject(subject): CurrentSubject,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    super::require_edit_permissions(&state, &subject).await?;

    state.store.delete_grant(GrantId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
