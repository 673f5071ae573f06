//! Grants: the unit the policy engine cascades over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::GrantId;
use super::pattern::{ResourcePattern, SubjectPattern};
use super::permission::{self, Permission};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,
    pub subject_pattern: SubjectPattern,
    pub resource_pattern: ResourcePattern,
    pub permission: Permission,
    pub extra: Option<Value>,
    pub created: DateTime<Utc>,
    pub expiry: Option<DateTime<Utc>>,
    pub negated: bool,
}

impl Grant {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_none_or(|expiry| now < expiry)
    }

    /// Defensive re-check of the write-time minimum-specificity constraint;
    /// rows that predate that check (e.g. a restored backup) are treated as
    /// inactive rather than purged.
    pub fn satisfies_registry(&self) -> bool {
        permission::satisfies_minimum(&self.permission, &self.resource_pattern)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGrant {
    pub subject_pattern: SubjectPattern,
    pub resource_pattern: ResourcePattern,
    pub permission: Permission,
    pub extra: Option<Value>,
    pub expiry: Option<DateTime<Utc>>,
    pub negated: bool,
}

#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum GrantError {
    /// permission {0} is not in the registry
    UnknownPermission(Permission),
    /// permission {permission} requires a resource of specificity >= {minimum}, but {given} was given
    BelowMinimumSpecificity {
        permission: Permission,
        minimum: u8,
        given: u8,
    },
    /// referenced group {0} does not exist
    UnknownGroup(super::ids::GroupId),
}

impl NewGrant {
    /// Write-time enforcement of invariant 3 (registry membership and
    /// minimum specificity). The evaluation-time "registry check" in the
    /// policy engine exists only for rows that predate this validation.
    pub fn validate(&self) -> Result<(), GrantError> {
        let Some(minimum) = permission::min_specificity(&self.permission) else {
            return Err(GrantError::UnknownPermission(self.permission.clone()));
        };
        let given = self.resource_pattern.specificity();
        if given < minimum {
            return Err(GrantError::BelowMinimumSpecificity {
                permission: self.permission.clone(),
                minimum,
                given,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(resource: ResourcePattern, permission: &str) -> NewGrant {
        NewGrant {
            subject_pattern: SubjectPattern::Everyone,
            resource_pattern: resource,
            permission: Permission::from(permission),
            extra: None,
            expiry: None,
            negated: false,
        }
    }

    #[test]
    fn rejects_fine_grained_permission_on_coarse_resource() {
        let new_grant = grant(ResourcePattern::Everything, "delete:data");
        assert!(matches!(
            new_grant.validate(),
            Err(GrantError::BelowMinimumSpecificity { .. })
        ));
    }

    #[test]
    fn accepts_permission_at_its_minimum_tier() {
        let new_grant = grant(
            ResourcePattern::Project { project_id: "p1".into() },
            "query:data",
        );
        assert!(new_grant.validate().is_ok());
    }

    #[test]
    fn rejects_unregistered_permission() {
        let new_grant = grant(ResourcePattern::Everything, "not:a_permission");
        assert!(matches!(
            new_grant.validate(),
            Err(GrantError::UnknownPermission(_))
        ));
    }
}
