//! The permission registry.
//!
//! Loaded once into a process-wide [`OnceLock`] from a static table, never
//! from the store, mirroring how the host stack treats its own closed
//! enumerations: immutable for the life of the process.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::pattern::ResourcePattern;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(pub String);

impl Permission {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Permission(s.to_string())
    }
}

/// A registered permission's name and the least-specific resource tier at
/// which it may be granted.
struct RegisteredPermission {
    name: &'static str,
    min_specificity: u8,
}

/// `Everything`-only administrative permissions sit at tier 0; project-level
/// data permissions at tier 1; fine-grained permissions require a full
/// dataset+data-type resource at tier 3. Tier 2 is exercised by
/// `query:project_metadata`, which may be scoped to either a dataset or a
/// data-type bucket.
const REGISTRY: &[RegisteredPermission] = &[
    RegisteredPermission { name: "edit:permissions", min_specificity: 0 },
    RegisteredPermission { name: "edit:groups", min_specificity: 0 },
    RegisteredPermission { name: "view:private_portal", min_specificity: 0 },
    RegisteredPermission { name: "delete:project", min_specificity: 1 },
    RegisteredPermission { name: "query:data", min_specificity: 1 },
    RegisteredPermission { name: "download:data", min_specificity: 1 },
    RegisteredPermission { name: "ingest:data", min_specificity: 1 },
    RegisteredPermission { name: "query:project_metadata", min_specificity: 2 },
    RegisteredPermission { name: "delete:data", min_specificity: 3 },
];

static INDEX: OnceLock<HashMap<&'static str, u8>> = OnceLock::new();

fn index() -> &'static HashMap<&'static str, u8> {
    INDEX.get_or_init(|| REGISTRY.iter().map(|p| (p.name, p.min_specificity)).collect())
}

/// `None` means the permission isn't registered at all.
pub fn min_specificity(permission: &Permission) -> Option<u8> {
    index().get(permission.as_str()).copied()
}

pub fn is_registered(permission: &Permission) -> bool {
    index().contains_key(permission.as_str())
}

pub fn all() -> Vec<Permission> {
    REGISTRY.iter().map(|p| Permission(p.name.to_string())).collect()
}

/// A grant whose resource specificity is below its permission's minimum is
/// invalid; evaluation treats any that slip through as inactive.
pub fn satisfies_minimum(permission: &Permission, resource: &ResourcePattern) -> bool {
    match min_specificity(permission) {
        Some(min) => resource.specificity() >= min,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_closed_and_stable() {
        let perm = Permission::from("query:data");
        assert!(is_registered(&perm));
        assert_eq!(min_specificity(&perm), Some(1));
        assert!(!is_registered(&Permission::from("not:a_permission")));
    }

    #[test]
    fn minimum_specificity_rejects_coarser_resources() {
        let perm = Permission::from("delete:data");
        assert!(!satisfies_minimum(&perm, &ResourcePattern::Everything));
        assert!(satisfies_minimum(
            &perm,
            &ResourcePattern::ProjectDatasetDataType {
                project_id: "p".into(),
                dataset_id: "d".into(),
                data_type: "t".into(),
            }
        ));
    }
}
