//! Group membership: either a claim expression tree or an explicit member
//! list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimOp {
    Eq,
    Ne,
    In,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MembershipExpr {
    Leaf { claim: String, op: ClaimOp, value: Value },
    And { and: Vec<MembershipExpr> },
    Or { or: Vec<MembershipExpr> },
    Not { not: Box<MembershipExpr> },
}

impl MembershipExpr {
    /// Evaluates against a subject's verified claim set. Missing claims make
    /// a leaf false rather than erroring, per the dotted-path lookup rule.
    pub fn evaluate(&self, claims: &Value) -> bool {
        match self {
            MembershipExpr::Leaf { claim, op, value } => {
                let Some(found) = lookup(claims, claim) else {
                    return false;
                };
                match op {
                    ClaimOp::Eq => found == value,
                    ClaimOp::Ne => found != value,
                    ClaimOp::In => value.as_array().is_some_and(|arr| arr.contains(found)),
                    ClaimOp::Contains => found.as_array().is_some_and(|arr| arr.contains(value)),
                }
            }
            MembershipExpr::And { and } => and.iter().all(|e| e.evaluate(claims)),
            MembershipExpr::Or { or } => or.iter().any(|e| e.evaluate(claims)),
            MembershipExpr::Not { not } => !not.evaluate(claims),
        }
    }
}

fn lookup<'a>(claims: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(claims, |acc, segment| acc.get(segment))
}

/// A member listed explicitly in a `List` group, matched the same way a
/// direct `IssuerAndClientAndSubject`/`IssuerAndSubject` subject pattern is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MemberPattern {
    IssuerAndClientAndSubject { iss: String, azp: String, sub: String },
    IssuerAndSubject { iss: String, sub: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Membership {
    Expr { expr: MembershipExpr },
    List { members: Vec<MemberPattern> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_missing_claim_is_false_not_error() {
        let expr = MembershipExpr::Leaf {
            claim: "email_verified".into(),
            op: ClaimOp::Eq,
            value: json!(true),
        };
        assert!(!expr.evaluate(&json!({})));
        assert!(expr.evaluate(&json!({"email_verified": true})));
    }

    #[test]
    fn dotted_path_and_boolean_combinators() {
        let expr = MembershipExpr::And {
            and: vec![
                MembershipExpr::Leaf {
                    claim: "org.role".into(),
                    op: ClaimOp::Eq,
                    value: json!("admin"),
                },
                MembershipExpr::Not {
                    not: Box::new(MembershipExpr::Leaf {
                        claim: "disabled".into(),
                        op: ClaimOp::Eq,
                        value: json!(true),
                    }),
                },
            ],
        };
        assert!(expr.evaluate(&json!({"org": {"role": "admin"}})));
        assert!(!expr.evaluate(&json!({"org": {"role": "admin"}, "disabled": true})));
    }
}
