//! The resolved caller identity the policy engine reasons about.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSubject {
    pub anonymous: bool,
    pub iss: Option<String>,
    pub sub: Option<String>,
    pub azp: Option<String>,
    pub claims: Option<Value>,
}

impl ResolvedSubject {
    pub fn anonymous() -> Self {
        ResolvedSubject {
            anonymous: true,
            iss: None,
            sub: None,
            azp: None,
            claims: None,
        }
    }

    pub fn claims_or_null(&self) -> Value {
        self.claims.clone().unwrap_or(Value::Null)
    }

    pub fn superuser_key(&self) -> Option<(&str, &str)> {
        match (&self.iss, &self.sub) {
            (Some(iss), Some(sub)) if !self.anonymous => Some((iss.as_str(), sub.as_str())),
            _ => None,
        }
    }
}
