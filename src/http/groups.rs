//! Group CRUD. Mutating operations are restricted to callers holding
//! `edit:groups`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::errors::Result;
use crate::model::{GroupId, NewGroup};
use crate::store::GroupUpdate;

use super::dto::{GroupDto, NewGroupRequest, UpdateGroupRequest};
use super::extract::CurrentSubject;
use super::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<GroupDto>>> {
    let groups = state.store.list_groups().await?;
    Ok(Json(groups.into_iter().map(GroupDto::from).collect()))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<GroupDto>> {
    let group = state.store.get_group(GroupId(id)).await?;
    Ok(Json(group.into()))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentSubject(subject): CurrentSubject,
    Json(req): Json<NewGroupRequest>,
) -> Result<(StatusCode, Json<GroupDto>)> {
    super::require_edit_groups(&state, &subject).await?;

    let new_group: NewGroup = req.into();
    new_group.validate()?;
    let group = state.store.create_group(new_group).await?;
    Ok((StatusCode::CREATED, Json(group.into())))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentSubject(subject): CurrentSubject,
    Path(id): Path<i64>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<GroupDto>> {
    super::require_edit_groups(&state, &subject).await?;

    let update = GroupUpdate { name: req.name, membership: req.membership };
    let group = state.store.update_group(GroupId(id), update).await?;
    Ok(Json(group.into()))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    CurrentSubject(subject): CurrentSubject,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    super::require_edit_groups(&state, &subject).await?;

    state.store.delete_group(GroupId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
