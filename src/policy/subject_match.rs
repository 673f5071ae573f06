//! Subject matcher (§4.E): whether a grant's subject pattern covers a
//! resolved caller. Group references require a store lookup, so this is
//! async unlike the resource matcher.

use chrono::Utc;

use crate::model::{MemberPattern, Membership, ResolvedSubject, SubjectPattern};
use crate::store::{Store, StoreError};

pub async fn matches(
    pattern: &SubjectPattern,
    resolved: &ResolvedSubject,
    store: &dyn Store,
) -> Result<bool, StoreError> {
    let matched = match pattern {
        SubjectPattern::Everyone => true,
        SubjectPattern::Anonymous => resolved.anonymous,
        SubjectPattern::IssuerAndClientAndSubject { iss, azp, sub } => {
            !resolved.anonymous
                && resolved.iss.as_deref() == Some(iss.as_str())
                && resolved.azp.as_deref() == Some(azp.as_str())
                && resolved.sub.as_deref() == Some(sub.as_str())
        }
        SubjectPattern::IssuerAndClient { iss, azp } => {
            !resolved.anonymous
                && resolved.iss.as_deref() == Some(iss.as_str())
                && resolved.azp.as_deref() == Some(azp.as_str())
        }
        SubjectPattern::IssuerAndSubject { iss, sub } => {
            !resolved.anonymous
                && resolved.iss.as_deref() == Some(iss.as_str())
                && resolved.sub.as_deref() == Some(sub.as_str())
        }
        SubjectPattern::Group { group_id } => {
            let group = store.get_group(*group_id).await?;
            if !group.is_active(Utc::now()) {
                false
            } else {
                match &group.membership {
                    Membership::Expr { expr } => expr.evaluate(&resolved.claims_or_null()),
                    Membership::List { members } => members.iter().any(|member| {
                        !resolved.anonymous && member_matches(member, resolved)
                    }),
                }
            }
        }
    };
    Ok(matched)
}

fn member_matches(member: &MemberPattern, resolved: &ResolvedSubject) -> bool {
    match member {
        MemberPattern::IssuerAndClientAndSubject { iss, azp, sub } => {
            resolved.iss.as_deref() == Some(iss.as_str())
                && resolved.azp.as_deref() == Some(azp.as_str())
                && resolved.sub.as_deref() == Some(sub.as_str())
        }
        MemberPattern::IssuerAndSubject { iss, sub } => {
            resolved.iss.as_deref() == Some(iss.as_str())
                && resolved.sub.as_deref() == Some(sub.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn anon() -> ResolvedSubject {
        ResolvedSubject::anonymous()
    }

    fn subject(iss: &str, sub: &str) -> ResolvedSubject {
        ResolvedSubject {
            anonymous: false,
            iss: Some(iss.into()),
            sub: Some(sub.into()),
            azp: None,
            claims: None,
        }
    }

    #[tokio::test]
    async fn everyone_matches_anonymous_and_named_subjects() {
        let store = MemoryStore::new();
        assert!(matches(&SubjectPattern::Everyone, &anon(), &store).await.unwrap());
        assert!(matches(&SubjectPattern::Everyone, &subject("i", "s"), &store).await.unwrap());
    }

    #[tokio::test]
    async fn anonymous_pattern_rejects_named_subjects() {
        let store = MemoryStore::new();
        assert!(matches(&SubjectPattern::Anonymous, &anon(), &store).await.unwrap());
        assert!(!matches(&SubjectPattern::Anonymous, &subject("i", "s"), &store).await.unwrap());
    }

    #[tokio::test]
    async fn issuer_and_subject_requires_exact_match() {
        let pattern = SubjectPattern::IssuerAndSubject { iss: "i".into(), sub: "s".into() };
        let store = MemoryStore::new();
        assert!(matches(&pattern, &subject("i", "s"), &store).await.unwrap());
        assert!(!matches(&pattern, &subject("i", "other"), &store).await.unwrap());
        assert!(!matches(&pattern, &anon(), &store).await.unwrap());
    }
}
