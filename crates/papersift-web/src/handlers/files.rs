use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use papersift_core::AddReport;

use crate::models::{FilesResponse, NoticeLog, error_body, session_id, with_session};
use crate::state::SharedState;
use crate::upload;

/// `POST /api/files`: extract and add every file in the form, one at a time.
pub async fn upload(
    State(state): State<SharedState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let (id, session) = state.sessions.resolve(session_id(&headers));

    let incoming = match upload::parse_multipart(multipart).await {
        Ok(files) => files,
        Err(e) => return with_session(&id, error_body(StatusCode::BAD_REQUEST, e)),
    };

    let log = NoticeLog::default();
    let mut session = session.lock().await;
    let report = state
        .pipeline
        .add_files(&mut session, incoming, &log.sink())
        .await;

    let body = FilesResponse::new(session.uploads.files(), report, log.take());
    with_session(&id, Json(body))
}

/// `GET /api/files`: an unknown session simply has no files.
pub async fn list(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let Some((id, session)) = state.sessions.get(session_id(&headers)) else {
        return Json(FilesResponse::new(&[], AddReport::default(), Vec::new())).into_response();
    };
    let session = session.lock().await;
    let body = FilesResponse::new(session.uploads.files(), AddReport::default(), Vec::new());
    with_session(&id, Json(body))
}

/// `DELETE /api/files/{index}`
pub async fn remove(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Response {
    let (id, session) = state.sessions.resolve(session_id(&headers));
    let mut session = session.lock().await;

    if state.pipeline.remove_file(&mut session, index).is_none() {
        return with_session(
            &id,
            error_body(StatusCode::NOT_FOUND, format!("No file at index {}", index)),
        );
    }
    let body = FilesResponse::new(session.uploads.files(), AddReport::default(), Vec::new());
    with_session(&id, Json(body))
}
