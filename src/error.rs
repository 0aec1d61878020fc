//! Error types for the field classifier.
//!
//! Structural errors (`Parse`, `MissingData`, `Structure`) are segment-local:
//! parsers collect them next to whatever was parsed successfully. `Access`
//! aborts the single document being read.

use thiserror::Error;

/// Primary error type for field extraction and classification.
#[derive(Debug, Error)]
pub enum FieldError {
    /// Source could not be read.
    #[error("Access error: {0}")]
    Access(#[from] std::io::Error),

    /// Malformed or unterminated block in the text grammar.
    #[error("Parse error at byte {offset}: {message} (near `{context}`)")]
    Parse {
        /// Byte offset of the failing block or token
        offset: usize,
        /// Source text at the offset
        context: String,
        /// What was expected
        message: String,
    },

    /// A dataset block without a `Values` sub-block.
    #[error("Dataset \"{name}\" at byte {offset} has no Values block")]
    MissingData { name: String, offset: usize },

    /// Expected group or leaf missing from the dataset hierarchy.
    #[error("Structure error at {path}: {message}")]
    Structure { path: String, message: String },

    /// Statistics requested on a zero-length sequence.
    #[error("No data: statistics requested on an empty sequence")]
    EmptySequence,

    /// Invalid option or threshold configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl FieldError {
    /// Build a parse error, capturing up to 40 bytes of context at `offset`.
    pub fn parse(text: &str, offset: usize, message: impl Into<String>) -> Self {
        FieldError::Parse {
            offset,
            context: snippet(text, offset, 40),
            message: message.into(),
        }
    }

    /// Build a structure error for a hierarchy path.
    pub fn structure(path: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError::Structure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Byte offset in the source document, when the error has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            FieldError::Parse { offset, .. } | FieldError::MissingData { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }

    /// Whether the error only affects one segment and the scan may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FieldError::Parse { .. }
                | FieldError::MissingData { .. }
                | FieldError::Structure { .. }
                | FieldError::EmptySequence
        )
    }
}

/// Take `len` bytes of `text` from `offset`, clamped to char boundaries and
/// with whitespace runs collapsed.
fn snippet(text: &str, offset: usize, len: usize) -> String {
    let mut start = offset.min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (start + len).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[start..end].split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Result type alias for classifier operations.
pub type Result<T> = std::result::Result<T, FieldError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    /// Prefix an access error with the path or label being read.
    fn context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| match e {
            FieldError::Access(io) => FieldError::Access(std::io::Error::new(
                io.kind(),
                format!("{}: {}", msg.into(), io),
            )),
            other => other,
        })
    }
}
