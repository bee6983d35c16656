//! Stateless proxy endpoints in front of Ollama.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use papersift_core::model::{RefineRequest, RefineResponse, SummarizeRequest, SummarizeResponse};

use crate::models::error_body;
use crate::state::SharedState;

/// Model used when the request body does not name one.
pub const PROXY_DEFAULT_MODEL: &str = "gemma:2b";

pub async fn refine_query(
    State(state): State<SharedState>,
    Json(req): Json<RefineRequest>,
) -> Response {
    let Some(query) = req.query.filter(|q| !q.is_empty()) else {
        return error_body(StatusCode::BAD_REQUEST, "Query is required").into_response();
    };
    let model = req.model.unwrap_or_else(|| PROXY_DEFAULT_MODEL.to_string());

    tracing::info!(%model, prompt_chars = query.len(), "refine request");
    match state.proxy_model.refine(&query, &model).await {
        Ok(refined) => Json(RefineResponse {
            refined_query: Some(refined),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, %model, "refine request failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error refining query with Ollama: {}", e),
            )
            .into_response()
        }
    }
}

pub async fn summarize_abstract(
    State(state): State<SharedState>,
    Json(req): Json<SummarizeRequest>,
) -> Response {
    let Some(abstract_text) = req.abstract_text.filter(|a| !a.is_empty()) else {
        return error_body(StatusCode::BAD_REQUEST, "Abstract is required").into_response();
    };
    let model = req.model.unwrap_or_else(|| PROXY_DEFAULT_MODEL.to_string());

    tracing::info!(%model, abstract_chars = abstract_text.len(), "summarize request");
    match state.proxy_model.summarize(&abstract_text, &model).await {
        Ok(summary) => Json(SummarizeResponse {
            summary: Some(summary),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, %model, "summarize request failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error summarizing abstract with Ollama: {}", e),
            )
            .into_response()
        }
    }
}
