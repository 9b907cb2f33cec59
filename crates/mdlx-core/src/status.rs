use thiserror::Error;

/// Fatal codec errors.
///
/// Recoverable conditions found while decoding are never returned through this
/// type; they are reported as [`crate::diagnostics::Diagnostic`] values instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MdlError {
    #[error("Malformed header: {0}")]
    MalformedHeader(String),
    #[error("Buffer decode error: {0}")]
    BufferError(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Layout invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Status = Result<(), MdlError>;

pub type StatusResult<T> = Result<T, MdlError>;

/// Re-labels a buffer error raised while reading a fixed-size header.
pub fn malformed_header(what: &str, err: MdlError) -> MdlError {
    match err {
        MdlError::BufferError(msg) => MdlError::MalformedHeader(format!("{}: {}", what, msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_header_relabels_buffer_errors() {
        let err = malformed_header("node header", MdlError::BufferError("short read".into()));
        assert_eq!(err, MdlError::MalformedHeader("node header: short read".into()));
    }

    #[test]
    fn test_malformed_header_keeps_other_errors() {
        let err = malformed_header("node header", MdlError::InvalidParameter("x".into()));
        assert_eq!(err, MdlError::InvalidParameter("x".into()));
    }

    #[test]
    fn test_display() {
        let err = MdlError::InvariantViolation("child count".into());
        assert_eq!(format!("{}", err), "Layout invariant violated: child count");
    }
}
