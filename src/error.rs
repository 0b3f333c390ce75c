use thiserror::Error;

/// Errors that can occur during hierarchy inspection
#[derive(Debug, Error)]
pub enum InspectorError {
    /// The supplied dump string was empty
    #[error("hierarchy dump is empty")]
    EmptyInput,

    /// The dump was not parseable XML
    #[error("malformed hierarchy dump: {0}")]
    MalformedInput(String),

    /// A lookup (cache entry, node path, coordinate) produced no result
    #[error("not found: {0}")]
    NotFound(String),

    /// A supplied XPath expression failed to parse or evaluate
    #[error("invalid XPath expression: {0}")]
    InvalidExpression(String),
}

/// Result type alias for inspector operations
pub type Result<T> = std::result::Result<T, InspectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InspectorError::EmptyInput;
        assert_eq!(err.to_string(), "hierarchy dump is empty");

        let err = InspectorError::NotFound("no entry for serial abc".to_string());
        assert!(err.to_string().contains("abc"));

        let err = InspectorError::InvalidExpression("unexpected token".to_string());
        assert!(err.to_string().contains("XPath"));
    }
}
