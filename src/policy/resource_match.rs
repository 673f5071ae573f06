//! Resource matcher (§4.D): pure coverage test between a grant's resource
//! pattern and a fully-qualified requested resource.

use crate::model::{Resource, ResourcePattern};

pub fn matches(pattern: &ResourcePattern, requested: &Resource) -> bool {
    match pattern {
        ResourcePattern::Everything => true,
        ResourcePattern::Project { project_id } => requested.project_id() == project_id,
        ResourcePattern::ProjectDataset { project_id, dataset_id } => {
            requested.project_id() == project_id
                && requested.dataset_id() == Some(dataset_id.as_str())
        }
        ResourcePattern::ProjectDataType { project_id, data_type } => {
            requested.project_id() == project_id
                && requested.data_type() == Some(data_type.as_str())
        }
        ResourcePattern::ProjectDatasetDataType { project_id, dataset_id, data_type } => {
            requested.project_id() == project_id
                && requested.dataset_id() == Some(dataset_id.as_str())
                && requested.data_type() == Some(data_type.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pddt(p: &str, d: &str, t: &str) -> Resource {
        Resource::ProjectDatasetDataType {
            project_id: p.into(),
            dataset_id: d.into(),
            data_type: t.into(),
        }
    }

    #[test]
    fn everything_matches_any_requested_resource() {
        assert!(matches(&ResourcePattern::Everything, &pddt("p1", "d1", "t1")));
    }

    #[test]
    fn project_dataset_does_not_cover_a_different_dataset() {
        let pattern = ResourcePattern::ProjectDataset {
            project_id: "p1".into(),
            dataset_id: "d1".into(),
        };
        assert!(matches(&pattern, &pddt("p1", "d1", "t1")));
        assert!(!matches(&pattern, &pddt("p1", "d2", "t1")));
    }

    #[test]
    fn project_data_type_covers_any_dataset_with_that_type() {
        let pattern = ResourcePattern::ProjectDataType {
            project_id: "p1".into(),
            data_type: "t1".into(),
        };
        assert!(matches(&pattern, &pddt("p1", "d1", "t1")));
        assert!(matches(&pattern, &pddt("p1", "d2", "t1")));
        assert!(!matches(&pattern, &pddt("p1", "d1", "t2")));
    }

    #[test]
    fn exact_triple_required_for_most_specific_pattern() {
        let pattern = ResourcePattern::ProjectDatasetDataType {
            project_id: "p1".into(),
            dataset_id: "d1".into(),
            data_type: "t1".into(),
        };
        assert!(matches(&pattern, &pddt("p1", "d1", "t1")));
        assert!(!matches(&pattern, &pddt("p1", "d1", "t2")));
    }
}
