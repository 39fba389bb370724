use thiserror::Error;

/// Errors raised while scanning a query string or a cookie header.
///
/// Positions are byte offsets into the raw input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty key at position {position}")]
    EmptyKey { position: usize },

    #[error("invalid percent escape at position {position}, expect two hex digits after '%'")]
    InvalidEscape { position: usize },

    #[error("decoded bytes ending at position {position} are not valid utf-8")]
    InvalidUtf8 { position: usize },
}

impl ParseError {
    pub fn empty_key(position: usize) -> Self {
        Self::EmptyKey { position }
    }

    pub fn invalid_escape(position: usize) -> Self {
        Self::InvalidEscape { position }
    }

    pub fn invalid_utf8(position: usize) -> Self {
        Self::InvalidUtf8 { position }
    }

    /// Returns the byte offset of the error: where the offending pair began for an
    /// empty key, where the escape or the decoded value sits otherwise.
    pub fn position(&self) -> usize {
        match self {
            Self::EmptyKey { position } | Self::InvalidEscape { position } | Self::InvalidUtf8 { position } => {
                *position
            }
        }
    }
}
