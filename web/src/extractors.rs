//! Custom Axum extractors.
//!
//! Authentication happens upstream: the gateway forwards the authenticated
//! caller in `X-Claimant-Id` and its roles in `X-Claimant-Roles`
//! (comma-separated). These extractors only read what the gateway asserted.
//!
//! - [`CorrelationId`]: the id set by the correlation middleware
//! - [`Claimant`]: the calling player (401 if missing or blank)
//! - [`AdminClaimant`]: a caller holding the `admin` role (403 otherwise)
//! - [`AppJson`] / [`AppPath`]: `Json` and `Path` whose rejections use the
//!   [`AppError`] body

use crate::error::AppError;
use crate::middleware::correlation_from_headers;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use draw_box_core::ClaimantId;
use uuid::Uuid;

/// Header carrying the authenticated caller id.
pub const CLAIMANT_ID_HEADER: &str = "X-Claimant-Id";

/// Header carrying the caller's roles, comma-separated.
pub const CLAIMANT_ROLES_HEADER: &str = "X-Claimant-Roles";

/// Role required for administrative endpoints.
pub const ADMIN_ROLE: &str = "admin";

/// Correlation ID for request tracing.
///
/// Prefers the id stored by the middleware, then the header, then a fresh
/// UUID.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| correlation_from_headers(&parts.headers))
            .unwrap_or_else(Uuid::new_v4);
        Ok(Self(id))
    }
}

/// The calling player.
#[derive(Debug, Clone)]
pub struct Claimant(pub ClaimantId);

fn claimant_from_parts(parts: &Parts) -> Result<ClaimantId, AppError> {
    let raw = parts
        .headers
        .get(CLAIMANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing caller identity"))?;
    ClaimantId::new(raw).map_err(|_| AppError::unauthorized("Missing caller identity"))
}

#[async_trait]
impl<S> FromRequestParts<S> for Claimant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        claimant_from_parts(parts).map(Self)
    }
}

/// A caller authorized for administrative operations.
#[derive(Debug, Clone)]
pub struct AdminClaimant(pub ClaimantId);

#[async_trait]
impl<S> FromRequestParts<S> for AdminClaimant
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claimant = claimant_from_parts(parts)?;
        let is_admin = parts
            .headers
            .get(CLAIMANT_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|roles| roles.split(',').any(|r| r.trim() == ADMIN_ROLE));
        if !is_admin {
            tracing::warn!(claimant = %claimant, "Admin operation refused");
            return Err(AppError::forbidden("Administrator role required"));
        }
        Ok(Self(claimant))
    }
}

/// JSON body extractor reporting malformed bodies as `INVALID_REQUEST`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor reporting unparsable segments as `INVALID_REQUEST`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
