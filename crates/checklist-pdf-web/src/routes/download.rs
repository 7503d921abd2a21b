//! Download routes - generated PDF and audit record.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use std::sync::Arc;

use crate::helpers::{OptionExt, ResultExt, RouteResult, attachment_disposition};
use crate::state::AppState;

/// Download a generated checklist PDF.
pub async fn download_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Response> {
    // Get path and name inside lock (fast)
    let (path, file_stem) = state
        .with_document(&id, |uuid, doc| (state.pdf_path(uuid), doc.file_stem.clone()))
        .await
        .or_not_found("Document not found")?;

    // Read outside lock (async)
    let data = tokio::fs::read(&path).await.or_internal_error()?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            attachment_disposition(&file_stem, "pdf"),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(data))
        .or_internal_error()
}

/// Download the audit record of a generated checklist.
pub async fn download_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> RouteResult<Response> {
    let (path, file_stem) = state
        .with_document(&id, |uuid, doc| {
            (state.audit_path(uuid), doc.file_stem.clone())
        })
        .await
        .or_not_found("Document not found")?;

    let data = tokio::fs::read(&path).await.or_internal_error()?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::CONTENT_DISPOSITION,
            attachment_disposition(&file_stem, "audit.json"),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(data))
        .or_internal_error()
}
