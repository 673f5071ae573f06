//! The abstract persistence interface. The policy engine and HTTP layer
//! depend only on [`Store`]; [`postgres::PgStore`] is the production
//! implementation, [`memory::MemoryStore`] backs tests without a live
//! database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use displaydoc::Display;
use thiserror::Error;

use crate::model::{Grant, GrantId, Group, GroupId, Membership, NewGrant, NewGroup};
use crate::model::{ResourcePattern, SubjectPattern};

#[derive(Debug, Display, Error)]
pub enum StoreError {
    /// {kind} {id} not found
    NotFound { kind: &'static str, id: i64 },
    /// {0}
    Conflict(String),
    /// store is temporarily unavailable: {0}
    Unavailable(String),
}

/// A partial update to an existing group: renaming and/or replacing its
/// membership. Groups are otherwise immutable, per the lifecycle rules.
#[derive(Debug, Default, Clone)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub membership: Option<Membership>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn list_grants(&self) -> Result<Vec<Grant>, StoreError>;
    async fn get_grant(&self, id: GrantId) -> Result<Grant, StoreError>;
    async fn create_grant(&self, new: NewGrant) -> Result<Grant, StoreError>;
    async fn delete_grant(&self, id: GrantId) -> Result<(), StoreError>;

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;
    async fn get_group(&self, id: GroupId) -> Result<Group, StoreError>;
    async fn create_group(&self, new: NewGroup) -> Result<Group, StoreError>;
    async fn update_group(&self, id: GroupId, update: GroupUpdate) -> Result<Group, StoreError>;
    async fn delete_group(&self, id: GroupId) -> Result<(), StoreError>;

    /// Upserts a resource pattern into the normalized `resources` table,
    /// returning its row id. Structural equality decides identity.
    async fn resolve_resource(&self, pattern: &ResourcePattern) -> Result<i64, StoreError>;

    /// Upserts a subject pattern into the normalized `subjects` table,
    /// returning its row id.
    async fn resolve_subject(&self, pattern: &SubjectPattern) -> Result<i64, StoreError>;

    /// Used by `GET /healthz`: can the store check out a connection.
    async fn healthy(&self) -> bool;
}
