//! The cascade/specificity/negation algorithm (§4.F step 3), isolated as a
//! pure function over pre-filtered grants so `evaluate` and `permissions_for`
//! share one code path.

use std::collections::BTreeMap;

use crate::model::{Grant, GrantId, ResourcePattern};

pub struct Decision {
    pub allow: bool,
    pub matched_grant_ids: Vec<GrantId>,
}

/// Levels specificity-2 patterns by the documented tie-break: dataset scope
/// (`ProjectDataset`) outranks data-type scope (`ProjectDataType`) even
/// though both report specificity 2.
fn level(pattern: &ResourcePattern) -> u8 {
    pattern.specificity() * 2 + pattern.tie_break_rank()
}

/// `candidates` must already be filtered to grants whose subject pattern,
/// resource pattern, and permission all match the request, and which are
/// active and registry-valid. Walks levels from most to least specific;
/// the first non-empty level decides the outcome.
pub fn decide<'a>(candidates: impl Iterator<Item = &'a Grant>) -> Decision {
    let mut levels: BTreeMap<u8, Vec<&Grant>> = BTreeMap::new();
    for grant in candidates {
        levels.entry(level(&grant.resource_pattern)).or_default().push(grant);
    }

    for grants in levels.into_values().rev() {
        let positives: Vec<&Grant> = grants.iter().filter(|g| !g.negated).copied().collect();
        let negatives_present = grants.iter().any(|g| g.negated);

        if positives.is_empty() && !negatives_present {
            continue;
        }
        if negatives_present {
            // Either a pure negation, or a tie with a positive at the same
            // level — both resolve to deny (safe default on tie).
            return Decision { allow: false, matched_grant_ids: Vec::new() };
        }
        return Decision {
            allow: true,
            matched_grant_ids: positives.iter().map(|g| g.id).collect(),
        };
    }

    Decision { allow: false, matched_grant_ids: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GrantId, Permission, SubjectPattern};
    use chrono::Utc;

    fn grant(id: i64, resource: ResourcePattern, negated: bool) -> Grant {
        Grant {
            id: GrantId(id),
            subject_pattern: SubjectPattern::Everyone,
            resource_pattern: resource,
            permission: Permission::from("query:data"),
            extra: None,
            created: Utc::now(),
            expiry: None,
            negated,
        }
    }

    #[test]
    fn no_candidates_denies() {
        let decision = decide(std::iter::empty());
        assert!(!decision.allow);
    }

    #[test]
    fn more_specific_negation_overrides_less_specific_positive() {
        let project = grant(1, ResourcePattern::Project { project_id: "p1".into() }, false);
        let dataset = grant(
            2,
            ResourcePattern::ProjectDataset { project_id: "p1".into(), dataset_id: "d1".into() },
            true,
        );
        let decision = decide(vec![&project, &dataset].into_iter());
        assert!(!decision.allow);
    }

    #[test]
    fn less_specific_negation_does_not_override_more_specific_positive() {
        let project = grant(1, ResourcePattern::Project { project_id: "p1".into() }, true);
        let dataset = grant(
            2,
            ResourcePattern::ProjectDataset { project_id: "p1".into(), dataset_id: "d1".into() },
            false,
        );
        let decision = decide(vec![&project, &dataset].into_iter());
        assert!(decision.allow);
        assert_eq!(decision.matched_grant_ids, vec![GrantId(2)]);
    }

    #[test]
    fn tie_at_same_specificity_denies() {
        let a = grant(1, ResourcePattern::Project { project_id: "p1".into() }, false);
        let b = grant(2, ResourcePattern::Project { project_id: "p1".into() }, true);
        let decision = decide(vec![&a, &b].into_iter());
        assert!(!decision.allow);
    }

    #[test]
    fn dataset_outranks_data_type_at_equal_specificity() {
        let data_type_negation = grant(
            1,
            ResourcePattern::ProjectDataType { project_id: "p1".into(), data_type: "t1".into() },
            true,
        );
        let dataset_positive = grant(
            2,
            ResourcePattern::ProjectDataset { project_id: "p1".into(), dataset_id: "d1".into() },
            false,
        );
        let decision = decide(vec![&data_type_negation, &dataset_positive].into_iter());
        assert!(decision.allow);
    }
}
