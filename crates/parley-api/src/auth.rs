use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use parley_db::Database;
use parley_types::api::{
    AccessToken, RegisterRequest, RegisterResponse, TokenObtainRequest, TokenRefreshRequest,
};

use crate::error::{ApiError, ApiResult};
use crate::pagination::PaginationSettings;
use crate::tokens::{JwtIssuer, TokenSettings};
use crate::validation::{self, FieldErrors, PASSWORD_MAX_LEN};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: JwtIssuer,
    pub pagination: PaginationSettings,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: &TokenSettings, pagination: PaginationSettings) -> AppState {
        Arc::new(Self {
            db,
            tokens: JwtIssuer::new(tokens),
            pagination,
        })
    }
}

/// Runs blocking DB work off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let value = tokio::task::spawn_blocking(move || f(&state.db)).await??;
    Ok(value)
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::new();
    let username = validation::required(&mut errors, "username", req.username.as_ref());
    let email = validation::required(&mut errors, "email", req.email.as_ref());
    let password = validation::required(&mut errors, "password", req.password.as_ref());
    if let Some(username) = username {
        validation::username(&mut errors, username);
    }
    if let Some(email) = email {
        validation::email(&mut errors, email);
    }
    if let Some(password) = password {
        validation::max_length(&mut errors, "password", password, PASSWORD_MAX_LEN);
    }
    errors.into_result()?;

    // All three are present once validation passed.
    let username = username.unwrap_or_default().to_owned();
    let email = email.unwrap_or_default().to_owned();
    let password = password.unwrap_or_default().to_owned();

    let (name, mail) = (username.clone(), email.clone());
    let created = blocking(&state, move |db| {
        if db.get_user_by_username(&name)?.is_some() {
            return Ok(None);
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        db.create_user(&name, &mail, &password_hash, chrono::Utc::now())
    })
    .await?;

    let Some(user_id) = created else {
        return Err(ApiError::Validation(FieldErrors::single(
            "username",
            "A user with that username already exists.",
        )));
    };

    info!("Registered user {} (id={})", username, user_id);

    Ok((StatusCode::CREATED, Json(RegisterResponse { username, email })))
}

pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenObtainRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::new();
    let username = validation::required(&mut errors, "username", req.username.as_ref());
    let password = validation::required(&mut errors, "password", req.password.as_ref());
    errors.into_result()?;

    let username = username.unwrap_or_default().to_owned();
    let password = password.unwrap_or_default().to_owned();

    let user = blocking(&state, move |db| {
        let Some(user) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };

        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("corrupt password hash for user {}: {}", user.id, e))?;
        let verified = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();

        Ok(verified.then_some(user))
    })
    .await?;

    let Some(user) = user else {
        warn!("Rejected token request: bad credentials");
        return Err(ApiError::InvalidCredentials);
    };

    let pair = state.tokens.issue_pair(user.id, &user.username)?;
    Ok(Json(pair))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRefreshRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::new();
    let refresh = validation::required(&mut errors, "refresh", req.refresh.as_ref());
    errors.into_result()?;

    let access = refresh
        .and_then(|token| state.tokens.refresh(token))
        .ok_or(ApiError::InvalidRefreshToken)?;

    Ok(Json(AccessToken { access }))
}
