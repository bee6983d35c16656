use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;

use papersift_core::QueryRequest;

use crate::models::{NoticeLog, QueriesResponse, VerboseQueryResponse, session_id, with_session};
use crate::state::SharedState;

/// `POST /api/queries`: 3-5 search queries, or an empty list plus an error
/// notice when generation fails.
pub async fn generate(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<QueryRequest>,
) -> Response {
    let (id, session) = state.sessions.resolve(session_id(&headers));
    let log = NoticeLog::default();

    let session = session.lock().await;
    let queries = state
        .pipeline
        .generate_queries(&session, req, &log.sink())
        .await;

    with_session(
        &id,
        Json(QueriesResponse {
            queries,
            notices: log.take(),
        }),
    )
}

/// `POST /api/verbose-query`
pub async fn generate_verbose(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<QueryRequest>,
) -> Response {
    let (id, session) = state.sessions.resolve(session_id(&headers));
    let log = NoticeLog::default();

    let mut session = session.lock().await;
    let verbose_query = state
        .pipeline
        .generate_verbose_query(&mut session, req, &log.sink())
        .await;

    with_session(
        &id,
        Json(VerboseQueryResponse {
            verbose_query,
            notices: log.take(),
        }),
    )
}
