use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, OriginalUri, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, Uri},
    Json,
};
use serde::Deserialize;
use url::form_urlencoded;

use crate::{
    core::{cursor::Cursor, dispatch::dispatch, limits::Page},
    error::{AppError, AppResult},
};

use super::{protocol::QueryResults, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct FetchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

/// `POST /v1/statement`: runs the first page of a new statement.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<QueryResults>> {
    let query = statement_text(&headers, uri.query(), &body)?;
    let page = Page::new(state.settings.page_size, 0, state.settings.max_rows)?;
    execute(&state, &uri, query, page).await
}

/// `GET /v1/statement?query=..&limit=..&offset=..`: runs the page a `nextUri` points at.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn fetch(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    params: Result<Query<FetchParams>, QueryRejection>,
) -> AppResult<Json<QueryResults>> {
    let Query(params) = params.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let page = Page::parse(
        params.limit.as_deref(),
        params.offset.as_deref(),
        state.settings.max_rows,
    )?;
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest("missing parameter: query".into()))?;
    execute(&state, &uri, query, page).await
}

async fn execute(
    state: &AppState,
    uri: &Uri,
    query: String,
    page: Page,
) -> AppResult<Json<QueryResults>> {
    let statement = dispatch(&query);
    tracing::info!(
        query = %query,
        rewritten = statement.rewritten,
        limit = page.limit,
        offset = page.offset,
        "running statement"
    );

    let deadline = Duration::from_millis(state.settings.timeout_ms);
    let result = tokio::time::timeout(deadline, state.connections.query_page(statement, page))
        .await
        .map_err(|_| AppError::Timeout(state.settings.timeout_ms))??;

    let next_uri = Cursor::following(&query, page, result.row_count())
        .map(|cursor| state.cursors.encode(uri.path(), uri.query(), &cursor));
    Ok(Json(QueryResults::success(result, next_uri)))
}

/// Statement text, in order of preference: the `query` field of a form body,
/// the raw body, the `query` URL parameter.
fn statement_text(
    headers: &HeaderMap,
    query_string: Option<&str>,
    body: &[u8],
) -> AppResult<String> {
    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    let text = match is_form.then(|| query_field(body)).flatten() {
        Some(text) => Some(text),
        None if !body.is_empty() => Some(String::from_utf8(body.to_vec()).map_err(|e| {
            AppError::InvalidRequest(format!("statement is not valid UTF-8: {e}"))
        })?),
        None => query_string.and_then(|qs| query_field(qs.as_bytes())),
    };

    text.filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest("missing statement text".into()))
}

fn query_field(raw: &[u8]) -> Option<String> {
    form_urlencoded::parse(raw)
        .find(|(k, _)| k == "query")
        .map(|(_, v)| v.into_owned())
}
