//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Option` and `Result` types
//! into HTTP-appropriate error responses, reducing boilerplate in routes.

use axum::http::StatusCode;

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
///
/// Provides convenient methods for returning 404 Not Found when
/// an expected resource (like a stored document) doesn't exist.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::NOT_FOUND, msg.to_string()))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
///
/// Provides convenient methods for converting errors into
/// appropriate HTTP status codes.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// `Content-Disposition` value offering `file_stem.ext` as a download.
///
/// Quotes and backslashes are dropped so the header stays well formed.
pub fn attachment_disposition(file_stem: &str, ext: &str) -> String {
    let stem: String = file_stem
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    format!("attachment; filename=\"{stem}.{ext}\"")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_or_not_found() {
        let missing: Option<u8> = None;
        let (status, msg) = missing.or_not_found("Document not found").unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(msg, "Document not found");
        assert_eq!(Some(3).or_not_found("x").unwrap(), 3);
    }

    #[test]
    fn test_result_ext() {
        let err: Result<(), String> = Err("bad".to_string());
        assert_eq!(err.clone().or_bad_request().unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.or_internal_error().unwrap_err().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition("North_Hall", "pdf"),
            "attachment; filename=\"North_Hall.pdf\""
        );
        assert_eq!(
            attachment_disposition("a\"b", "json"),
            "attachment; filename=\"ab.json\""
        );
    }
}
