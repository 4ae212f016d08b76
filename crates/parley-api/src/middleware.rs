use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use tracing::warn;

use parley_types::api::TokenType;

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiResult};

/// The authenticated caller, inserted as a request extension by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Validate the bearer access token and load its user.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_| ApiError::Unauthenticated)?;

    let claims = state
        .tokens
        .verify(bearer.token(), TokenType::Access)
        .ok_or_else(|| {
            warn!("Rejected request with invalid access token");
            ApiError::InvalidToken
        })?;

    let user = blocking(&state, move |db| db.get_user_by_id(claims.sub))
        .await?
        .ok_or(ApiError::UserNotFound)?;

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
    });
    Ok(next.run(req).await)
}
