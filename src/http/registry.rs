//! `GET /all_permissions`: the closed, process-wide permission registry.

use axum::Json;
use serde::Serialize;

use crate::model::permission;

#[derive(Debug, Serialize)]
pub struct PermissionInfo {
    pub name: String,
    pub min_specificity: u8,
}

pub async fn all_permissions() -> Json<Vec<PermissionInfo>> {
    let names = permission::all();
    let info = names
        .into_iter()
        .map(|p| PermissionInfo {
            min_specificity: permission::min_specificity(&p).unwrap_or(0),
            name: p.as_str().to_string(),
        })
        .collect();
    Json(info)
}
