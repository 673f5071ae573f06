//! Pulls a bearer token off the request (if any) and resolves it into a
//! [`ResolvedSubject`] using the shared [`TokenVerifier`]. Missing or absent
//! tokens both resolve to the anonymous subject; only a present-but-invalid
//! token is rejected.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::auth::resolver;
use crate::errors::ApiError;
use crate::model::ResolvedSubject;

use super::AppState;

pub struct CurrentSubject(pub ResolvedSubject);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentSubject {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await;

        let claims = match header {
            Ok(TypedHeader(Authorization(bearer))) => {
                Some(state.verifier.verify(bearer.token()).await?)
            }
            Err(_) => None,
        };

        Ok(CurrentSubject(resolver::resolve(claims)))
    }
}
