//! Process configuration, loaded once from the environment at startup.

use std::time::Duration;

use displaydoc::Display;
use thiserror::Error;

const DATABASE_URI_VAR: &str = "DATABASE_URI";
const OPENID_CONFIG_URL_VAR: &str = "OPENID_CONFIG_URL";
const TOKEN_AUDIENCE_VAR: &str = "TOKEN_AUDIENCE";
const DISABLE_TOKEN_VERIFICATION_VAR: &str = "DISABLE_TOKEN_VERIFICATION";
const BENTO_DEBUG_VAR: &str = "BENTO_DEBUG";
const BENTO_AUTHZ_SERVICE_URL_VAR: &str = "BENTO_AUTHZ_SERVICE_URL";
const CORS_ORIGINS_VAR: &str = "CORS_ORIGINS";
const SUPERUSERS_VAR: &str = "BENTO_SUPERUSERS";
const BIND_ADDRESS_VAR: &str = "BIND_ADDRESS";
const DB_MAX_CONNECTIONS_VAR: &str = "DB_MAX_CONNECTIONS";
const JWKS_CACHE_TTL_SECS_VAR: &str = "JWKS_CACHE_TTL_SECS";
const JWT_LEEWAY_SECS_VAR: &str = "JWT_LEEWAY_SECS";
const REQUEST_TIMEOUT_SECS_VAR: &str = "REQUEST_TIMEOUT_SECS";

const BIND_ADDRESS_DEFAULT: &str = "0.0.0.0:8080";
const DB_MAX_CONNECTIONS_DEFAULT: u32 = 10;
const JWKS_CACHE_TTL_SECS_DEFAULT: u64 = 600;
const JWT_LEEWAY_SECS_DEFAULT: u64 = 30;
const REQUEST_TIMEOUT_SECS_DEFAULT: u64 = 10;

#[derive(Debug, Display, Error)]
pub enum Error {
    /// missing required environment variable {0}
    Missing(&'static str),
    /// failed to parse {var}: {detail}
    Parse { var: &'static str, detail: String },
    /// DISABLE_TOKEN_VERIFICATION is set without BENTO_DEBUG; refusing to start with signature verification disabled outside debug mode
    UnsafeVerificationBypass,
}

/// A `{iss, sub}` pair that bypasses the grant cascade entirely, consulted
/// only by the policy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superuser {
    pub iss: String,
    pub sub: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_uri: String,
    pub openid_config_url: String,
    pub token_audience: Vec<String>,
    pub disable_token_verification: bool,
    pub debug: bool,
    pub service_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub superusers: Vec<Superuser>,
    pub bind_address: String,
    pub db_max_connections: u32,
    pub jwks_cache_ttl: Duration,
    pub jwt_leeway_secs: u64,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let debug = read_bool(BENTO_DEBUG_VAR);
        let disable_token_verification = read_bool(DISABLE_TOKEN_VERIFICATION_VAR);
        if disable_token_verification && !debug {
            return Err(Error::UnsafeVerificationBypass);
        }

        Ok(Config {
            database_uri: require(DATABASE_URI_VAR)?,
            openid_config_url: require(OPENID_CONFIG_URL_VAR)?,
            token_audience: require(TOKEN_AUDIENCE_VAR)?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            disable_token_verification,
            debug,
            service_url: std::env::var(BENTO_AUTHZ_SERVICE_URL_VAR).ok(),
            cors_origins: std::env::var(CORS_ORIGINS_VAR)
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            superusers: parse_superusers(&std::env::var(SUPERUSERS_VAR).unwrap_or_default())?,
            bind_address: std::env::var(BIND_ADDRESS_VAR)
                .unwrap_or_else(|_| BIND_ADDRESS_DEFAULT.to_string()),
            db_max_connections: read_parsed(
                DB_MAX_CONNECTIONS_VAR,
                DB_MAX_CONNECTIONS_DEFAULT,
            )?,
            jwks_cache_ttl: Duration::from_secs(read_parsed(
                JWKS_CACHE_TTL_SECS_VAR,
                JWKS_CACHE_TTL_SECS_DEFAULT,
            )?),
            jwt_leeway_secs: read_parsed(JWT_LEEWAY_SECS_VAR, JWT_LEEWAY_SECS_DEFAULT)?,
            request_timeout: Duration::from_secs(read_parsed(
                REQUEST_TIMEOUT_SECS_VAR,
                REQUEST_TIMEOUT_SECS_DEFAULT,
            )?),
        })
    }
}

fn require(var: &'static str) -> Result<String, Error> {
    std::env::var(var).map_err(|_| Error::Missing(var))
}

fn read_bool(var: &'static str) -> bool {
    std::env::var(var).is_ok_and(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
}

fn read_parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|err: T::Err| Error::Parse { var, detail: err.to_string() }),
        Err(_) => Ok(default),
    }
}

fn parse_superusers(raw: &str) -> Result<Vec<Superuser>, Error> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (iss, sub) = entry.split_once('|').ok_or(Error::Parse {
                var: SUPERUSERS_VAR,
                detail: format!("expected iss|sub, got {entry:?}"),
            })?;
            Ok(Superuser { iss: iss.to_string(), sub: sub.to_string() })
        })
        .collect()
}
