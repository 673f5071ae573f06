//! An in-memory [`Store`] used by the policy engine and HTTP handler tests.
//! Snapshot consistency for readers is provided by cloning under a
//! `RwLock`, the in-memory equivalent of the Postgres implementation's
//! `REPEATABLE READ` transaction.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::model::grant::GrantError;
use crate::model::{
    Grant, GrantId, Group, GroupId, NewGrant, NewGroup, ResourcePattern, SubjectPattern,
};

use super::{GroupUpdate, Store, StoreError};

#[derive(Default)]
struct Inner {
    grants: Vec<Grant>,
    groups: Vec<Group>,
    resources: Vec<(ResourcePattern, i64)>,
    subjects: Vec<(SubjectPattern, i64)>,
}

pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    next_grant_id: AtomicI64,
    next_group_id: AtomicI64,
    next_pattern_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Arc::new(RwLock::new(Inner::default())),
            next_grant_id: AtomicI64::new(1),
            next_group_id: AtomicI64::new(1),
            next_pattern_id: AtomicI64::new(1),
        }
    }

    /// Test convenience: seed a grant directly, bypassing registry
    /// validation, so fixtures can exercise the "registry check" defensive
    /// path in the policy engine.
    pub async fn seed_grant(&self, grant: Grant) {
        self.inner.write().await.grants.push(grant);
    }

    pub async fn seed_group(&self, group: Group) {
        self.inner.write().await.groups.push(group);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_grants(&self) -> Result<Vec<Grant>, StoreError> {
        Ok(self.inner.read().await.grants.clone())
    }

    async fn get_grant(&self, id: GrantId) -> Result<Grant, StoreError> {
        self.inner
            .read()
            .await
            .grants
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(StoreError::NotFound { kind: "grant", id: id.0 })
    }

    async fn create_grant(&self, new: NewGrant) -> Result<Grant, StoreError> {
        if let Err(err) = new.validate() {
            return Err(StoreError::Conflict(err.to_string()));
        }

        let mut inner = self.inner.write().await;
        if let SubjectPattern::Group { group_id } = &new.subject_pattern {
            let group_id = *group_id;
            if !inner.groups.iter().any(|g| g.id == group_id) {
                return Err(StoreError::Conflict(GrantError::UnknownGroup(group_id).to_string()));
            }
        }
        let duplicate = inner.grants.iter().any(|g| {
            g.subject_pattern == new.subject_pattern
                && g.resource_pattern == new.resource_pattern
                && g.permission == new.permission
                && g.expiry == new.expiry
        });
        if duplicate {
            return Err(StoreError::Conflict("duplicate grant".into()));
        }

        let grant = Grant {
            id: GrantId(self.next_grant_id.fetch_add(1, Ordering::SeqCst)),
            subject_pattern: new.subject_pattern,
            resource_pattern: new.resource_pattern,
            permission: new.permission,
            extra: new.extra,
            created: Utc::now(),
            expiry: new.expiry,
            negated: new.negated,
        };
        inner.grants.push(grant.clone());
        Ok(grant)
    }

    async fn delete_grant(&self, id: GrantId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.grants.len();
        inner.grants.retain(|g| g.id != id);
        if inner.grants.len() == before {
            return Err(StoreError::NotFound { kind: "grant", id: id.0 });
        }
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.inner.read().await.groups.clone())
    }

    async fn get_group(&self, id: GroupId) -> Result<Group, StoreError> {
        self.inner
            .read()
            .await
            .groups
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(StoreError::NotFound { kind: "group", id: id.0 })
    }

    async fn create_group(&self, new: NewGroup) -> Result<Group, StoreError> {
        if let Err(err) = new.validate() {
            return Err(StoreError::Conflict(err.to_string()));
        }

        let mut inner = self.inner.write().await;
        if inner.groups.iter().any(|g| g.name == new.name) {
            return Err(StoreError::Conflict(format!("group name {:?} already taken", new.name)));
        }

        let group = Group {
            id: GroupId(self.next_group_id.fetch_add(1, Ordering::SeqCst)),
            name: new.name,
            membership: new.membership,
            created: Utc::now(),
            expiry: new.expiry,
        };
        inner.groups.push(group.clone());
        Ok(group)
    }

    async fn update_group(&self, id: GroupId, update: GroupUpdate) -> Result<Group, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(name) = &update.name {
            if inner.groups.iter().any(|g| g.id != id && &g.name == name) {
                return Err(StoreError::Conflict(format!("group name {name:?} already taken")));
            }
        }
        let group = inner
            .groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound { kind: "group", id: id.0 })?;
        if let Some(name) = update.name {
            group.name = name;
        }
        if let Some(membership) = update.membership {
            group.membership = membership;
        }
        Ok(group.clone())
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let referenced = inner.grants.iter().any(|g| {
            matches!(&g.subject_pattern, SubjectPattern::Group { group_id } if *group_id == id)
        });
        if referenced {
            return Err(StoreError::Conflict(format!(
                "group {id} is still referenced by one or more grants"
            )));
        }
        let before = inner.groups.len();
        inner.groups.retain(|g| g.id != id);
        if inner.groups.len() == before {
            return Err(StoreError::NotFound { kind: "group", id: id.0 });
        }
        Ok(())
    }

    async fn resolve_resource(&self, pattern: &ResourcePattern) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some((_, id)) = inner.resources.iter().find(|(p, _)| p == pattern) {
            return Ok(*id);
        }
        let id = self.next_pattern_id.fetch_add(1, Ordering::SeqCst);
        inner.resources.push((pattern.clone(), id));
        Ok(id)
    }

    async fn resolve_subject(&self, pattern: &SubjectPattern) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        if let Some((_, id)) = inner.subjects.iter().find(|(p, _)| p == pattern) {
            return Ok(*id);
        }
        let id = self.next_pattern_id.fetch_add(1, Ordering::SeqCst);
        inner.subjects.push((pattern.clone(), id));
        Ok(id)
    }

    async fn healthy(&self) -> bool {
        true
    }
}
