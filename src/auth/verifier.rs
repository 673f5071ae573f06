//! Bearer token verification: OIDC discovery, JWKS key selection, signature
//! and claim validation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use displaydoc::Display;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use thiserror::Error;

use super::claims::VerifiedClaims;
use super::jwks::{DiscoveredKeys, JwksCache};

#[derive(Debug, Display, Error)]
pub enum VerifyError {
    /// malformed token: {0}
    Malformed(String),
    /// token is missing a key id and the issuer publishes more than one key
    AmbiguousKey,
    /// no published key matches kid {0:?}
    UnknownKid(String),
    /// key algorithm is not in the allow-list
    AlgorithmNotAllowed,
    /// issuer discovery document is unreachable: {0}
    DiscoveryUnreachable(String),
    /// issuer JWKS endpoint is unreachable: {0}
    JwksUnreachable(String),
    /// signature or claim validation failed: {0}
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

pub struct TokenVerifier {
    openid_config_url: String,
    audience: Vec<String>,
    algorithms: Vec<Algorithm>,
    leeway_secs: u64,
    disable_verification: bool,
    jwks: JwksCache,
}

impl TokenVerifier {
    pub fn new(
        openid_config_url: String,
        audience: Vec<String>,
        leeway_secs: u64,
        jwks_cache_ttl_secs: u64,
        disable_verification: bool,
    ) -> Self {
        TokenVerifier {
            openid_config_url,
            audience,
            algorithms: vec![Algorithm::RS256, Algorithm::ES256],
            leeway_secs,
            disable_verification,
            jwks: JwksCache::new(std::time::Duration::from_secs(jwks_cache_ttl_secs)),
        }
    }

    /// `bearer` is the raw JWT, without the `Bearer ` prefix.
    pub async fn verify(&self, bearer: &str) -> Result<VerifiedClaims, VerifyError> {
        if self.disable_verification {
            return self.decode_unverified(bearer);
        }

        let header =
            decode_header(bearer).map_err(|err| VerifyError::Malformed(err.to_string()))?;

        let discovered = self.jwks.get(&self.openid_config_url).await?;
        match self.decode_with_keys(bearer, &header, &discovered) {
            Ok(claims) => Ok(claims),
            Err(VerifyError::InvalidToken(err))
                if matches!(err.kind(), jsonwebtoken::errors::ErrorKind::InvalidSignature) =>
            {
                let refreshed = self.jwks.force_refresh(&self.openid_config_url).await?;
                self.decode_with_keys(bearer, &header, &refreshed)
            }
            Err(err) => Err(err),
        }
    }

    fn decode_with_keys(
        &self,
        bearer: &str,
        header: &jsonwebtoken::Header,
        discovered: &DiscoveredKeys,
    ) -> Result<VerifiedClaims, VerifyError> {
        let jwk = select_key(&discovered.keys, header.kid.as_deref())?;
        let algorithm = algorithm_for_jwk(jwk, &self.algorithms)?;
        let decoding_key = DecodingKey::from_jwk(jwk)?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[discovered.issuer.as_str()]);
        validation.set_audience(&self.audience);
        validation.leeway = self.leeway_secs;

        let data = decode::<VerifiedClaims>(bearer, &decoding_key, &validation)?;
        Ok(data.claims)
    }

    fn decode_unverified(&self, bearer: &str) -> Result<VerifiedClaims, VerifyError> {
        let payload = bearer
            .split('.')
            .nth(1)
            .ok_or_else(|| VerifyError::Malformed("token has no payload segment".into()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|err| VerifyError::Malformed(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| VerifyError::Malformed(err.to_string()))
    }
}

fn select_key<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Result<&'a Jwk, VerifyError> {
    match kid {
        Some(kid) => keys
            .find(kid)
            .ok_or_else(|| VerifyError::UnknownKid(kid.to_string())),
        None if keys.keys.len() == 1 => Ok(&keys.keys[0]),
        None => Err(VerifyError::AmbiguousKey),
    }
}

fn algorithm_for_jwk(jwk: &Jwk, allowed: &[Algorithm]) -> Result<Algorithm, VerifyError> {
    if let Some(algorithm) = jwk.common.algorithm {
        let algorithm = match algorithm {
            Algorithm::RS256 => Algorithm::RS256,
            Algorithm::ES256 => Algorithm::ES256,
            _ => return Err(VerifyError::AlgorithmNotAllowed),
        };
        return allowed
            .contains(&algorithm)
            .then_some(algorithm)
            .ok_or(VerifyError::AlgorithmNotAllowed);
    }

    let inferred = match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Algorithm::RS256,
        AlgorithmParameters::EllipticCurve(_) => Algorithm::ES256,
        _ => return Err(VerifyError::AlgorithmNotAllowed),
    };
    allowed
        .contains(&inferred)
        .then_some(inferred)
        .ok_or(VerifyError::AlgorithmNotAllowed)
}
