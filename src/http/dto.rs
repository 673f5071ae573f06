//! Wire-format request and response bodies. Domain types already carry a
//! `#[serde(tag = "type")]` discriminator, so most DTOs wrap them directly
//! and only add the shape constraints that make sense at the HTTP boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::model::{
    Grant, Group, Membership, NewGrant, NewGroup, Permission, Resource, ResourcePattern,
    SubjectPattern,
};

#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateRequest {
    #[validate(length(min = 1, message = "resources must not be empty"))]
    pub resources: Vec<Resource>,
    #[validate(length(min = 1, message = "permissions must not be empty"))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub result: Vec<Vec<bool>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateOneRequest {
    pub resource: Resource,
    pub permission: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluateOneResponse {
    pub result: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PermissionsRequest {
    #[validate(length(min = 1, message = "resources must not be empty"))]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub result: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct GrantDto {
    pub id: i64,
    pub subject_pattern: SubjectPattern,
    pub resource_pattern: ResourcePattern,
    pub permission: String,
    pub extra: Option<Value>,
    pub created: DateTime<Utc>,
    pub expiry: Option<DateTime<Utc>>,
    pub negated: bool,
}

impl From<Grant> for GrantDto {
    fn from(grant: Grant) -> Self {
        GrantDto {
            id: grant.id.into(),
            subject_pattern: grant.subject_pattern,
            resource_pattern: grant.resource_pattern,
            permission: grant.permission.as_str().to_string(),
            extra: grant.extra,
            created: grant.created,
            expiry: grant.expiry,
            negated: grant.negated,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewGrantRequest {
    pub subject_pattern: SubjectPattern,
    pub resource_pattern: ResourcePattern,
    pub permission: String,
    #[serde(default)]
    pub extra: Option<Value>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub negated: bool,
}

impl From<NewGrantRequest> for NewGrant {
    fn from(req: NewGrantRequest) -> Self {
        NewGrant {
            subject_pattern: req.subject_pattern,
            resource_pattern: req.resource_pattern,
            permission: Permission::from(req.permission.as_str()),
            extra: req.extra,
            expiry: req.expiry,
            negated: req.negated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupDto {
    pub id: i64,
    pub name: String,
    pub membership: Membership,
    pub created: DateTime<Utc>,
    pub expiry: Option<DateTime<Utc>>,
}

impl From<Group> for GroupDto {
    fn from(group: Group) -> Self {
        GroupDto {
            id: group.id.into(),
            name: group.name,
            membership: group.membership,
            created: group.created,
            expiry: group.expiry,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewGroupRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub membership: Membership,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl From<NewGroupRequest> for NewGroup {
    fn from(req: NewGroupRequest) -> Self {
        NewGroup { name: req.name, membership: req.membership, expiry: req.expiry }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateGroupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub membership: Option<Membership>,
}
