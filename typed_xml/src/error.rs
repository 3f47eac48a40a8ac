use thiserror::Error;

// Error message prefixes
const MSG_FAILED_TO_PREFIX: &str = "Failed to";
const MSG_INVALID_PREFIX: &str = "Invalid";

/// Result type for the `typed_xml` library
pub type Result<T> = std::result::Result<T, error_stack::Report<Error>>;

/// Failure categories surfaced by codec construction and by every carrier
#[derive(Debug, Error)]
pub enum Error {
    /// The engine cannot build a codec for the type
    #[error("Cannot construct codec for {type_name}: {reason}")]
    Construction {
        /// Fully qualified name of the primary type
        type_name: String,
        /// Why the type shape was rejected
        reason:    String,
    },

    /// I/O failure on a file or stream carrier
    #[error("File operation failed: {0}")]
    FileOperation(String),

    /// A required argument was absent or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The cache holds an entry that does not match the requested type
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed input text or a structure mismatch while reading or writing
    #[error("Transformation failed: {0}")]
    Transformation(String),
}

impl Error {
    /// Create a construction failure for `type_name`
    pub fn construction(type_name: &str, reason: impl std::fmt::Display) -> Self {
        Self::Construction {
            type_name: type_name.to_string(),
            reason:    reason.to_string(),
        }
    }

    /// Create a "Failed to X" transformation error
    pub fn failed_to(action: &str, details: impl std::fmt::Display) -> Self {
        Self::Transformation(format!("{MSG_FAILED_TO_PREFIX} {action}: {details}"))
    }

    /// Create an "Invalid X" error
    pub fn invalid(what: &str, details: impl std::fmt::Display) -> Self {
        Self::InvalidArgument(format!("{MSG_INVALID_PREFIX} {what}: {details}"))
    }

    /// Create error for IO operations
    pub fn io_failed(
        operation: &str,
        path: &std::path::Path,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::FileOperation(format!(
            "{MSG_FAILED_TO_PREFIX} {operation} {}: {error}",
            path.display()
        ))
    }

    /// Whether this error is an invalid-argument failure
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Whether this error is a codec construction failure
    pub const fn is_construction(&self) -> bool {
        matches!(self, Self::Construction { .. })
    }

    /// Whether this error happened while transforming text or touching a carrier
    pub const fn is_transformation(&self) -> bool {
        matches!(self, Self::Transformation(_) | Self::FileOperation(_))
    }
}
