use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

use papersift_core::SortCriteria;
use papersift_reporting::ExportFormat;

use crate::models::{
    CardResponse, NoticeLog, RenderRequest, RenderResponse, SortRequest, SortResponse,
    error_body, session_id, with_session,
};
use crate::state::SharedState;

/// `POST /api/results/render`: summarize and render a result list, keeping
/// it on the session.
pub async fn render(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<RenderRequest>,
) -> Response {
    let (id, session) = state.sessions.resolve(session_id(&headers));
    let log = NoticeLog::default();

    let mut session = session.lock().await;
    let rendered = state
        .pipeline
        .render_results(&mut session, req.results, &log.sink())
        .await;

    with_session(&id, Json(RenderResponse::new(rendered, log.take())))
}

/// `POST /api/results/{index}/toggle`
pub async fn toggle(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Response {
    let not_found = || {
        error_body(
            StatusCode::NOT_FOUND,
            format!("No expandable card at index {}", index),
        )
    };
    let Some((id, session)) = state.sessions.get(session_id(&headers)) else {
        return not_found().into_response();
    };
    let mut session = session.lock().await;

    match state.pipeline.toggle_card(&mut session, index) {
        Some(html) => {
            let expanded = session
                .results
                .as_ref()
                .is_some_and(|view| view.is_expanded(index));
            with_session(&id, Json(CardResponse { index, expanded, html }))
        }
        None => with_session(&id, not_found()),
    }
}

/// `POST /api/results/sort`
pub async fn sort(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<SortRequest>,
) -> Response {
    let criteria: SortCriteria = match req.criteria.parse() {
        Ok(c) => c,
        Err(e) => return error_body(StatusCode::BAD_REQUEST, e).into_response(),
    };

    let Some((id, session)) = state.sessions.get(session_id(&headers)) else {
        return error_body(StatusCode::NOT_FOUND, "No results to sort").into_response();
    };
    let mut session = session.lock().await;
    match state.pipeline.sort_results(&mut session, criteria) {
        Some(html) => with_session(
            &id,
            Json(SortResponse {
                criteria: criteria.to_string(),
                html,
            }),
        ),
        None => with_session(&id, error_body(StatusCode::NOT_FOUND, "No results to sort")),
    }
}

/// `GET /api/results/export/{format}`
pub async fn export(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(format): Path<String>,
) -> Response {
    let format: ExportFormat = match format.parse() {
        Ok(f) => f,
        Err(e) => return error_body(StatusCode::BAD_REQUEST, e).into_response(),
    };

    let Some((id, session)) = state.sessions.get(session_id(&headers)) else {
        return error_body(StatusCode::NOT_FOUND, "No results to export").into_response();
    };
    let session = session.lock().await;
    let Some(view) = session.results.as_ref().filter(|v| !v.is_empty()) else {
        return with_session(&id, error_body(StatusCode::NOT_FOUND, "No results to export"));
    };

    let body = papersift_reporting::export(view.papers(), format);
    let disposition = format!(
        "attachment; filename=\"papersift-results.{}\"",
        format.extension()
    );
    with_session(
        &id,
        (
            [
                (header::CONTENT_TYPE, format.mime_type().to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response(),
    )
}
