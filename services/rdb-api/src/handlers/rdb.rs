//! RDB retrieval handler.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::Response,
};
use futures::stream;
use tracing::debug;

use rdb_common::RdbError;

use crate::pipeline::RdbOutput;
use crate::request::RdbQueryParams;
use crate::state::AppState;

const RDB_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// GET /aq2rdb
pub async fn rdb_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<RdbQueryParams>,
) -> Response {
    debug!(?params, "RDB request");

    let request = match params.into_request() {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match state.pipeline.run(request).await {
        Ok(output) => rdb_response(output),
        Err(e) => error_response(&e),
    }
}

/// Stream the header, then one chunk per row.
///
/// A row failure after streaming has begun cannot change the status code,
/// so it is written as an error comment and the body ends there.
pub fn rdb_response(output: RdbOutput) -> Response {
    let RdbOutput { header, rows } = output;

    let rows = rows.map(|row| row.unwrap_or_else(|e| e.to_rdb_comment()));
    let chunks = std::iter::once(header)
        .chain(rows)
        .map(Ok::<String, Infallible>);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, RDB_CONTENT_TYPE)
        .body(Body::from_stream(stream::iter(chunks)))
        .unwrap_or_else(|_| internal_error())
}

/// Render an error as a one-line RDB comment with the matching status.
pub fn error_response(error: &RdbError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, RDB_CONTENT_TYPE)
        .body(Body::from(error.to_rdb_comment()))
        .unwrap_or_else(|_| internal_error())
}

fn internal_error() -> Response {
    let mut response = Response::new(Body::from("# //ERROR internal error\n"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
