//! Maps a verified claim set (or its absence) onto a [`ResolvedSubject`].
//! Pure: the superuser bootstrap list is consulted by the policy engine, not
//! here, so this stays a side-effect-free function of its input.

use serde_json::Value;

use crate::model::ResolvedSubject;

use super::claims::VerifiedClaims;

pub fn resolve(claims: Option<VerifiedClaims>) -> ResolvedSubject {
    match claims {
        None => ResolvedSubject::anonymous(),
        Some(claims) => {
            let mut extra = claims.extra;
            if let Value::Object(map) = &mut extra {
                map.insert("aud".into(), Value::from(claims.aud));
            }
            ResolvedSubject {
                anonymous: false,
                iss: Some(claims.iss),
                sub: Some(claims.sub),
                azp: claims.azp,
                claims: Some(extra),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_claims_resolves_to_anonymous() {
        let subject = resolve(None);
        assert!(subject.anonymous);
        assert!(subject.iss.is_none());
    }

    #[test]
    fn verified_claims_resolve_to_concrete_subject() {
        let claims = VerifiedClaims {
            iss: "https://issuer.example".into(),
            sub: "user-1".into(),
            azp: Some("client-1".into()),
            aud: vec!["bento".into()],
            exp: 0,
            iat: None,
            nbf: None,
            extra: serde_json::json!({"email_verified": true}),
        };
        let subject = resolve(Some(claims));
        assert!(!subject.anonymous);
        assert_eq!(subject.iss.as_deref(), Some("https://issuer.example"));
        assert_eq!(subject.sub.as_deref(), Some("user-1"));
    }
}
