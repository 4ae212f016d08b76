use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use parley_types::api::{MessageResponse, SendMessageRequest, StatusResponse};

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::pagination::PageRequest;
use crate::serializers;
use crate::validation::{self, FieldErrors};

/// GET /messages/{thread_id}/ — a page of the thread's messages.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    thread_id: Result<Path<i64>, PathRejection>,
    page: PageRequest,
) -> ApiResult<impl IntoResponse> {
    let Path(thread_id) = thread_id?;
    let (limit, offset) = (page.limit, page.offset);

    let listed = blocking(&state, move |db| {
        if db.get_thread_for_participant(thread_id, caller.id)?.is_none() {
            return Ok(None);
        }
        let count = db.count_messages(thread_id)?;
        let rows = db.list_messages(thread_id, limit, offset)?;
        Ok(Some((count, rows)))
    })
    .await?;

    let (count, rows) = listed.ok_or(ApiError::ThreadUnavailable)?;
    let results: Vec<MessageResponse> = rows.iter().map(serializers::message).collect();
    Ok(Json(page.into_page(count, results)))
}

/// POST /messages/{thread_id}/ — post a message as the caller.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    thread_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(thread_id) = thread_id?;

    let caller_id = caller.id;
    let thread = blocking(&state, move |db| db.get_thread_for_participant(thread_id, caller_id)).await?;
    if thread.is_none() {
        return Err(ApiError::ThreadUnavailable);
    }

    let Json(req) = payload?;
    let mut errors = FieldErrors::new();
    let text = validation::required(&mut errors, "text", req.text.as_ref()).map(str::to_owned);
    errors.into_result()?;
    let text = text.unwrap_or_default();

    let row = blocking(&state, move |db| {
        db.insert_message(thread_id, caller_id, &text, chrono::Utc::now())
    })
    .await?;

    debug!("Message {} posted to thread {} by {}", row.id, thread_id, caller.username);

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse::success(serializers::message(&row))),
    ))
}

/// PATCH /messages/{thread_id}/ — flag every message in the thread as read.
///
/// Neither thread existence nor caller participation is checked.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    thread_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(thread_id) = thread_id?;

    let changed = blocking(&state, move |db| db.mark_thread_read(thread_id)).await?;
    debug!("{} marked {} messages read in thread {}", caller.username, changed, thread_id);

    Ok(Json(StatusResponse::success("Messages from thread are read")))
}

/// GET /unread_msgs/ — unread messages addressed to the caller.
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let caller_id = caller.id;
    let count = blocking(&state, move |db| db.count_unread_for_user(caller_id)).await?;

    Ok(Json(StatusResponse::success(format!(
        "Unread messages for {} - {}",
        caller.username, count
    ))))
}
