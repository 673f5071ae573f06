//! End-to-end coverage of the cascade/specificity/negation algorithm and the
//! matrix/scalar/permission-set entry points against an in-memory store.

use bento_authz::model::{
    ClaimOp, Grant, GrantId, Group, GroupId, Membership, MembershipExpr, Permission,
    ResolvedSubject, Resource, ResourcePattern, SubjectPattern,
};
use bento_authz::policy::PolicyEngine;
use bento_authz::store::memory::MemoryStore;
use chrono::Utc;
use std::sync::Arc;

fn grant(
    id: i64,
    subject: SubjectPattern,
    resource: ResourcePattern,
    permission: &str,
    negated: bool,
) -> Grant {
    Grant {
        id: GrantId(id),
        subject_pattern: subject,
        resource_pattern: resource,
        permission: Permission::from(permission),
        extra: None,
        created: Utc::now(),
        expiry: None,
        negated,
    }
}

#[tokio::test]
async fn anonymous_deny_on_empty_store() {
    let store = Arc::new(MemoryStore::new());
    let engine = PolicyEngine::new(store, Vec::new());

    let decisions = engine
        .evaluate(
            &ResolvedSubject::anonymous(),
            &[Resource::Project { project_id: "p1".into() }],
            &[Permission::from("query:data")],
        )
        .await
        .unwrap();

    assert_eq!(decisions, vec![vec![false]]);
}

#[tokio::test]
async fn superuser_bypasses_the_cascade_entirely() {
    let store = Arc::new(MemoryStore::new());
    let superuser = bento_authz::config::Superuser { iss: "I".into(), sub: "U".into() };
    let engine = PolicyEngine::new(store, vec![superuser]);

    let subject = ResolvedSubject {
        anonymous: false,
        iss: Some("I".into()),
        sub: Some("U".into()),
        azp: None,
        claims: None,
    };

    let decisions = engine
        .evaluate(
            &subject,
            &[Resource::Project { project_id: "p1".into() }],
            &[Permission::from("delete:project")],
        )
        .await
        .unwrap();

    assert_eq!(decisions, vec![vec![true]]);
}

#[tokio::test]
async fn more_specific_negation_overrides_a_coarser_positive_grant() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_grant(grant(
            1,
            SubjectPattern::Everyone,
            ResourcePattern::Project { project_id: "p1".into() },
            "query:data",
            false,
        ))
        .await;
    store
        .seed_grant(grant(
            2,
            SubjectPattern::Everyone,
            ResourcePattern::ProjectDataset { project_id: "p1".into(), dataset_id: "d1".into() },
            "query:data",
            true,
        ))
        .await;

    let engine = PolicyEngine::new(store, Vec::new());
    let subject = ResolvedSubject::anonymous();

    let denied = engine
        .evaluate_one(
            &subject,
            &Resource::ProjectDataset { project_id: "p1".into(), dataset_id: "d1".into() },
            &Permission::from("query:data"),
        )
        .await
        .unwrap();
    assert!(!denied);

    let allowed = engine
        .evaluate_one(
            &subject,
            &Resource::ProjectDataset { project_id: "p1".into(), dataset_id: "d2".into() },
            &Permission::from("query:data"),
        )
        .await
        .unwrap();
    assert!(allowed);
}

#[tokio::test]
async fn group_membership_via_claim_expression() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_group(Group {
            id: GroupId(1),
            name: "verified".into(),
            membership: Membership::Expr {
                expr: MembershipExpr::Leaf {
                    claim: "email_verified".into(),
                    op: ClaimOp::Eq,
                    value: serde_json::json!(true),
                },
            },
            created: Utc::now(),
            expiry: None,
        })
        .await;
    store
        .seed_grant(grant(
            1,
            SubjectPattern::Group { group_id: GroupId(1) },
            ResourcePattern::Everything,
            "view:private_portal",
            false,
        ))
        .await;

    let engine = PolicyEngine::new(store, Vec::new());
    let resource = Resource::Project { project_id: "any".into() };
    let permission = Permission::from("view:private_portal");

    let verified = ResolvedSubject {
        anonymous: false,
        iss: Some("i".into()),
        sub: Some("s".into()),
        azp: None,
        claims: Some(serde_json::json!({"email_verified": true})),
    };
    assert!(engine.evaluate_one(&verified, &resource, &permission).await.unwrap());

    let unverified = ResolvedSubject {
        claims: Some(serde_json::json!({"email_verified": false})),
        ..verified
    };
    assert!(!engine.evaluate_one(&unverified, &resource, &permission).await.unwrap());
}

#[tokio::test]
async fn matrix_shape_and_evaluate_one_consistency() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_grant(grant(
            1,
            SubjectPattern::Everyone,
            ResourcePattern::Project { project_id: "p1".into() },
            "query:data",
            false,
        ))
        .await;

    let engine = PolicyEngine::new(store, Vec::new());
    let subject = ResolvedSubject::anonymous();
    let resources = vec![
        Resource::Project { project_id: "p1".into() },
        Resource::Project { project_id: "p2".into() },
        Resource::Project { project_id: "p3".into() },
    ];
    let permissions = vec![Permission::from("query:data"), Permission::from("download:data")];

    let matrix = engine.evaluate(&subject, &resources, &permissions).await.unwrap();
    assert_eq!(matrix.len(), 3);
    assert!(matrix.iter().all(|row| row.len() == 2));

    for (i, resource) in resources.iter().enumerate() {
        for (j, permission) in permissions.iter().enumerate() {
            let scalar = engine.evaluate_one(&subject, resource, permission).await.unwrap();
            assert_eq!(scalar, matrix[i][j]);
        }
    }
}

#[tokio::test]
async fn expired_grant_never_contributes() {
    let store = Arc::new(MemoryStore::new());
    let mut expired = grant(
        1,
        SubjectPattern::Everyone,
        ResourcePattern::Project { project_id: "p1".into() },
        "query:data",
        false,
    );
    expired.expiry = Some(Utc::now() - chrono::Duration::seconds(1));
    store.seed_grant(expired).await;

    let engine = PolicyEngine::new(store, Vec::new());
    let allowed = engine
        .evaluate_one(
            &ResolvedSubject::anonymous(),
            &Resource::Project { project_id: "p1".into() },
            &Permission::from("query:data"),
        )
        .await
        .unwrap();
    assert!(!allowed);
}
