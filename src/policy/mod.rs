//! The policy engine (§4.F): the only module that combines the resource
//! matcher, subject matcher, and cascade algorithm into a decision.

pub mod decision;
pub mod resource_match;
pub mod subject_match;

use std::sync::Arc;

use chrono::Utc;

use crate::config::Superuser;
use crate::logging::log_evaluation;
use crate::model::{Grant, GrantId, Permission, ResolvedSubject, Resource};
use crate::model::permission as registry;
use crate::store::{Store, StoreError};

pub struct PolicyEngine {
    store: Arc<dyn Store>,
    superusers: Vec<Superuser>,
}

impl PolicyEngine {
    pub fn new(store: Arc<dyn Store>, superusers: Vec<Superuser>) -> Self {
        PolicyEngine { store, superusers }
    }

    fn is_superuser(&self, subject: &ResolvedSubject) -> bool {
        subject.superuser_key().is_some_and(|(iss, sub)| {
            self.superusers.iter().any(|s| s.iss == iss && s.sub == sub)
        })
    }

    /// Row per resource, column per permission.
    pub async fn evaluate(
        &self,
        subject: &ResolvedSubject,
        resources: &[Resource],
        permissions: &[Permission],
    ) -> Result<Vec<Vec<bool>>, StoreError> {
        if self.is_superuser(subject) {
            let matrix = vec![vec![true; permissions.len()]; resources.len()];
            log_evaluation(subject, resources, permissions, &"superuser bypass", &[]);
            return Ok(matrix);
        }

        let active_grants = self.active_grants().await?;
        let mut matrix = Vec::with_capacity(resources.len());
        let mut all_matched = Vec::new();

        for resource in resources {
            let mut row = Vec::with_capacity(permissions.len());
            for permission in permissions {
                let candidates =
                    self.candidates(&active_grants, subject, resource, Some(permission)).await?;
                let decision = decision::decide(candidates.into_iter());
                row.push(decision.allow);
                all_matched.extend(decision.matched_grant_ids);
            }
            matrix.push(row);
        }

        log_evaluation(subject, resources, permissions, &matrix, &all_matched);
        Ok(matrix)
    }

    pub async fn evaluate_one(
        &self,
        subject: &ResolvedSubject,
        resource: &Resource,
        permission: &Permission,
    ) -> Result<bool, StoreError> {
        let matrix = self
            .evaluate(subject, std::slice::from_ref(resource), std::slice::from_ref(permission))
            .await?;
        Ok(matrix[0][0])
    }

    /// Set of permissions held per resource.
    pub async fn permissions_for(
        &self,
        subject: &ResolvedSubject,
        resources: &[Resource],
    ) -> Result<Vec<Vec<Permission>>, StoreError> {
        let registry_permissions = registry::all();

        if self.is_superuser(subject) {
            let sets = vec![registry_permissions.clone(); resources.len()];
            log_evaluation(subject, resources, &registry_permissions, &"superuser bypass", &[]);
            return Ok(sets);
        }

        let active_grants = self.active_grants().await?;
        let mut sets = Vec::with_capacity(resources.len());
        let mut all_matched = Vec::new();

        for resource in resources {
            let mut held = Vec::new();
            for permission in &registry_permissions {
                let candidates =
                    self.candidates(&active_grants, subject, resource, Some(permission)).await?;
                let decision = decision::decide(candidates.into_iter());
                if decision.allow {
                    held.push(permission.clone());
                }
                all_matched.extend(decision.matched_grant_ids);
            }
            sets.push(held);
        }

        log_evaluation(subject, resources, &registry_permissions, &sets, &all_matched);
        Ok(sets)
    }

    async fn active_grants(&self) -> Result<Vec<Grant>, StoreError> {
        let now = Utc::now();
        Ok(self
            .store
            .list_grants()
            .await?
            .into_iter()
            .filter(|g| g.is_active(now) && g.satisfies_registry())
            .collect())
    }

    async fn candidates<'a>(
        &self,
        active_grants: &'a [Grant],
        subject: &ResolvedSubject,
        resource: &Resource,
        permission: Option<&Permission>,
    ) -> Result<Vec<&'a Grant>, StoreError> {
        let mut matched = Vec::new();
        for grant in active_grants {
            if let Some(permission) = permission {
                if &grant.permission != permission {
                    continue;
                }
            }
            if !resource_match::matches(&grant.resource_pattern, resource) {
                continue;
            }
            if !subject_match::matches(&grant.subject_pattern, subject, self.store.as_ref())
                .await?
            {
                continue;
            }
            matched.push(grant);
        }
        Ok(matched)
    }
}

/// Referenced by the HTTP layer when logging which grant ids produced an
/// allow for an admin-action self-check.
pub type MatchedGrants = Vec<GrantId>;
