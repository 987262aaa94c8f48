//! Error taxonomy for the export pipeline.
//!
//! Missing report data never shows up here: the normalizer absorbs it.

/// Error type for export operations
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The capture surface failed (oversized raster, busy surface, empty document)
    #[error("Rasterization failed: {0}")]
    Rasterization(String),

    /// Page slicing or PDF assembly failed
    #[error("Assembly failed: {0}")]
    Assembly(String),

    /// Hand-off to the save/download facility failed
    #[error("Save failed: {0}")]
    Save(String),

    /// Hand-off to the print facility failed
    #[error("Print failed: {0}")]
    Print(String),

    /// Input could not be decoded at the boundary
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The user declined the fallback after a primary-path failure
    #[error("Export aborted after: {cause}")]
    Aborted { cause: Box<ExportError> },
}

impl ExportError {
    /// Whether the fallback path may recover from this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExportError::Rasterization(_) | ExportError::Assembly(_))
    }
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_primary_path_errors_are_recoverable() {
        assert!(ExportError::Rasterization("x".into()).is_recoverable());
        assert!(ExportError::Assembly("x".into()).is_recoverable());
        assert!(!ExportError::Save("x".into()).is_recoverable());
        assert!(!ExportError::Print("x".into()).is_recoverable());
    }

    #[test]
    fn aborted_mentions_cause() {
        let err = ExportError::Aborted {
            cause: Box::new(ExportError::Rasterization("surface busy".into())),
        };
        assert!(err.to_string().contains("surface busy"));
    }
}
