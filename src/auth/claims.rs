//! The claim set produced by a successful token verification.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn deserialize_aud<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(aud) => vec![aud],
        OneOrMany::Many(auds) => auds,
    })
}

/// The `aud` claim may be a single string or an array per the JWT spec; the
/// rest of the flattened claim set is kept as JSON for group-membership
/// expression evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedClaims {
    pub iss: String,
    pub sub: String,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_aud")]
    pub aud: Vec<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(flatten)]
    pub extra: Value,
}
