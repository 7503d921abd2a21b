//! HTTP route handlers for the checklist web service.
//!
//! All routes return JSON or binary data (PDF, audit JSON). The browser form
//! itself is served elsewhere.

mod download;
mod submit;

pub use download::{download_audit, download_pdf};
pub use submit::submit_checklist;

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness check.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
