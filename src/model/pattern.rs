//! Subject and resource patterns: the tagged variants that grants are
//! expressed over.
//!
//! Both enums are `serde`-tagged on a `type` discriminator and stored by the
//! `Store` as self-describing documents. Matching logic lives in
//! `crate::policy`; this module only carries the shapes and the resource
//! specificity lattice.

use serde::{Deserialize, Serialize};

use super::ids::GroupId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SubjectPattern {
    Anonymous,
    Everyone,
    IssuerAndClientAndSubject { iss: String, azp: String, sub: String },
    IssuerAndClient { iss: String, azp: String },
    IssuerAndSubject { iss: String, sub: String },
    Group { group_id: GroupId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResourcePattern {
    Everything,
    Project {
        project_id: String,
    },
    ProjectDataset {
        project_id: String,
        dataset_id: String,
    },
    ProjectDataType {
        project_id: String,
        data_type: String,
    },
    ProjectDatasetDataType {
        project_id: String,
        dataset_id: String,
        data_type: String,
    },
}

impl ResourcePattern {
    /// Height in the cascade lattice. Ties at 2 are broken by the caller
    /// preferring `ProjectDataset` over `ProjectDataType`.
    pub fn specificity(&self) -> u8 {
        match self {
            ResourcePattern::Everything => 0,
            ResourcePattern::Project { .. } => 1,
            ResourcePattern::ProjectDataset { .. } | ResourcePattern::ProjectDataType { .. } => 2,
            ResourcePattern::ProjectDatasetDataType { .. } => 3,
        }
    }

    /// `ProjectDataset` outranks `ProjectDataType` at equal specificity: dataset
    /// scope beats data-type scope in the cascade.
    pub fn tie_break_rank(&self) -> u8 {
        match self {
            ResourcePattern::ProjectDataset { .. } => 1,
            ResourcePattern::ProjectDataType { .. } => 0,
            _ => 0,
        }
    }
}

/// A fully-qualified resource a request names. `Everything` is never a legal
/// request target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Resource {
    Project {
        project_id: String,
    },
    ProjectDataset {
        project_id: String,
        dataset_id: String,
    },
    ProjectDataType {
        project_id: String,
        data_type: String,
    },
    ProjectDatasetDataType {
        project_id: String,
        dataset_id: String,
        data_type: String,
    },
}

impl Resource {
    pub fn project_id(&self) -> &str {
        match self {
            Resource::Project { project_id }
            | Resource::ProjectDataset { project_id, .. }
            | Resource::ProjectDataType { project_id, .. }
            | Resource::ProjectDatasetDataType { project_id, .. } => project_id,
        }
    }

    pub fn dataset_id(&self) -> Option<&str> {
        match self {
            Resource::ProjectDataset { dataset_id, .. }
            | Resource::ProjectDatasetDataType { dataset_id, .. } => Some(dataset_id),
            Resource::Project { .. } | Resource::ProjectDataType { .. } => None,
        }
    }

    pub fn data_type(&self) -> Option<&str> {
        match self {
            Resource::ProjectDataType { data_type, .. }
            | Resource::ProjectDatasetDataType { data_type, .. } => Some(data_type),
            Resource::Project { .. } | Resource::ProjectDataset { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specificity_orders_everything_below_project() {
        assert!(ResourcePattern::Everything.specificity() < ResourcePattern::Project {
            project_id: "p1".into()
        }
        .specificity());
    }

    #[test]
    fn dataset_and_data_type_patterns_tie() {
        let dataset = ResourcePattern::ProjectDataset {
            project_id: "p1".into(),
            dataset_id: "d1".into(),
        };
        let data_type = ResourcePattern::ProjectDataType {
            project_id: "p1".into(),
            data_type: "t1".into(),
        };
        assert_eq!(dataset.specificity(), data_type.specificity());
        assert!(dataset.tie_break_rank() > data_type.tie_break_rank());
    }
}
