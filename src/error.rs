//! Structured error types for tickntie.
//!
//! Every user-facing failure (upload, preview, export, import) surfaces as one of
//! these kinds and is turned into a single notification at the operation boundary
//! via [`EvidenceError::user_message`].

/// All errors that can leave a session operation.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    /// Rejected upload; no state was mutated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A locator could not be rendered into a preview.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Export or import of a project archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Configuration JSON could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl EvidenceError {
    /// Human-readable message suitable for a single UI notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(ValidationError::UnsupportedType { .. }) => {
                "Invalid file type. Please upload an image or PDF.".to_string()
            }
            Self::Validation(ValidationError::TooLarge { limit, .. }) => {
                format!(
                    "Image file too large. Maximum size is {}MB",
                    limit / (1024 * 1024)
                )
            }
            Self::Render(e) => format!("Failed to load preview: {e}"),
            Self::Archive(ArchiveError::MissingWorkbook) => {
                "Failed to import project: the archive does not contain a workbook".to_string()
            }
            Self::Archive(e) => format!("Project archive failed: {e}"),
            Self::Config(e) => format!("Invalid configuration: {e}"),
        }
    }
}

/// Upload validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Neither the MIME type nor the file extension is an accepted image or PDF type.
    #[error("Unsupported file type for {file_name} ({mime_type})")]
    UnsupportedType {
        file_name: String,
        mime_type: String,
    },

    /// Non-PDF file above the configured size ceiling.
    #[error("{file_name} is {size} bytes, above the {limit} byte limit")]
    TooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },
}

/// Render failures. Cloned to every waiter of a shared render.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The renderer does not handle this kind of content.
    #[error("Unsupported content: {0}")]
    Unsupported(String),

    /// The content was recognised but could not be decoded.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// The renderer gave up waiting on the content.
    #[error("Render timed out")]
    TimedOut,
}

/// Archive (export/import) failures.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// ZIP container error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error while reading or writing archive entries.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive has no spreadsheet artifact.
    #[error("No workbook.xlsx or workbook.csv found in archive")]
    MissingWorkbook,

    /// The spreadsheet artifact exists but cannot be understood.
    #[error("Malformed workbook: {0}")]
    MalformedWorkbook(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EvidenceError>;

/// Result of archive reading and writing.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;
