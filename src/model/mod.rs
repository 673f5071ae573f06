pub mod grant;
pub mod group;
pub mod ids;
pub mod membership;
pub mod pattern;
pub mod permission;
pub mod subject;

pub use grant::{Grant, GrantError, NewGrant};
pub use group::{Group, GroupError, NewGroup};
pub use ids::{GrantId, GroupId};
pub use membership::{ClaimOp, MemberPattern, Membership, MembershipExpr};
pub use pattern::{Resource, ResourcePattern, SubjectPattern};
pub use permission::Permission;
pub use subject::ResolvedSubject;
