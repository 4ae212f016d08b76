use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use parley_db::models::DirectThread;
use parley_types::api::{NewThreadRequest, StatusResponse};

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::pagination::PageRequest;
use crate::serializers::ThreadContext;
use crate::validation::{self, FieldErrors};

/// POST /new_thread/ — open a direct thread between the caller and `user`.
pub async fn create_thread(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    payload: Result<Json<NewThreadRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;

    let mut errors = FieldErrors::new();
    let target = validation::required(&mut errors, "user", req.user.as_ref()).map(str::to_owned);
    errors.into_failure()?;
    let target = target.unwrap_or_default();

    let lookup = target.clone();
    let other = blocking(&state, move |db| db.get_user_by_username(&lookup)).await?;
    let Some(other) = other else {
        return Err(FieldErrors::single(
            "user",
            format!("User {} is not registered in system", target),
        )
        .failure());
    };
    if other.id == caller.id {
        return Err(FieldErrors::single("user", "You cannot start a thread with yourself").failure());
    }

    let caller_id = caller.id;
    let outcome = blocking(&state, move |db| {
        db.create_direct_thread(caller_id, other.id, chrono::Utc::now())
    })
    .await?;

    match outcome {
        DirectThread::Existing { participants, .. } => Err(ApiError::failure(format!(
            "Thread with [{}] already exists",
            participants.join(", ")
        ))),
        DirectThread::Created { id, participants } => {
            info!("Thread {} created by {}", id, caller.username);
            Ok((
                StatusCode::CREATED,
                Json(StatusResponse::success(format!(
                    "Thread with id={} with participants [{}] was created",
                    id,
                    participants.join(", ")
                ))),
            ))
        }
    }
}

/// GET /threads/ — the caller's threads, each with its latest message.
pub async fn list_threads(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    page: PageRequest,
) -> ApiResult<impl IntoResponse> {
    let (limit, offset) = (page.limit, page.offset);

    let (count, rows, context) = blocking(&state, move |db| {
        let count = db.count_threads_for_user(caller.id)?;
        let rows = db.list_threads_for_user(caller.id, limit, offset)?;

        let thread_ids: Vec<i64> = rows.iter().map(|t| t.id).collect();
        let context = ThreadContext {
            last_messages: db.get_last_messages(&thread_ids)?,
            participants: db.get_participants(&thread_ids)?,
        };

        Ok((count, rows, context))
    })
    .await?;

    let results = rows.iter().map(|row| context.thread(row)).collect();
    Ok(Json(page.into_page(count, results)))
}
