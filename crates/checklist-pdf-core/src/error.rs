use thiserror::Error;

/// Unified error type for checklist-pdf-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Template operations (opening, reading, saving)
/// - Form field access (lookup, type mismatches)
/// - Image decoding and font loading
/// - Configuration and submission parsing
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF / Template Errors
    // ==========================================================================
    /// Failed to open or parse the template PDF
    #[error("failed to open template: {0}")]
    PdfOpen(String),

    /// Invalid page index requested
    #[error("invalid page index {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Template has no usable pages
    #[error("template has no pages")]
    TemplateEmpty,

    /// Failed to save the assembled PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Form Field Errors
    // ==========================================================================
    /// A descriptor named a field the template does not contain
    #[error("form field not found: {0}")]
    FieldNotFound(String),

    /// A descriptor's type disagrees with the live form object
    #[error("form field '{name}' is a {found}, expected {expected}")]
    FieldTypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    // ==========================================================================
    // Asset Errors
    // ==========================================================================
    /// Failed to decode an uploaded image
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    /// Failed to load or parse a TrueType font
    #[error("failed to load font: {0}")]
    FontLoad(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // Submission / Audit Errors
    // ==========================================================================
    /// Submission payload could not be parsed
    #[error("invalid submission: {0}")]
    Submission(String),

    /// Audit record could not be encoded
    #[error("failed to encode audit record: {0}")]
    AuditEncode(String),

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
