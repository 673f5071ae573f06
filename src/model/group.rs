//! Groups: named, reusable subject patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::GroupId;
use super::membership::Membership;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub membership: Membership,
    pub created: DateTime<Utc>,
    pub expiry: Option<DateTime<Utc>>,
}

impl Group {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_none_or(|expiry| now < expiry)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub membership: Membership,
    pub expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum GroupError {
    /// group name must not be empty
    EmptyName,
    /// group name {0:?} is already taken
    DuplicateName(String),
    /// group {0} is still referenced by one or more grants
    InUse(GroupId),
}

impl NewGroup {
    pub fn validate(&self) -> Result<(), GroupError> {
        if self.name.trim().is_empty() {
            return Err(GroupError::EmptyName);
        }
        Ok(())
    }
}
