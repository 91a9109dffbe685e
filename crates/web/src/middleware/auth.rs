use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::TypedHeader;
use chrono::Utc;
use demurrage::{database::Database, Caller};
use headers::{authorization::Bearer, Authorization};

use crate::{common::RouteErrorResponse, WebState};

/// The caller behind the request's bearer token. Rejects the request with
/// `401` if the token is missing, unknown or expired.
pub struct Authenticated(pub Caller);

#[async_trait]
impl<D> FromRequestParts<WebState<D>> for Authenticated
where
    D: Database,
{
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebState<D>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| RouteErrorResponse::unauthorized())?;

        let caller = state
            .client
            .authenticate(bearer.token(), Utc::now())
            .await
            .map_err(RouteErrorResponse::from)?;
        log::debug!("request by user {}", caller.user.id);
        Ok(Self(caller))
    }
}
