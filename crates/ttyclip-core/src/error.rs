//! Internal error type for the escape-sequence codec.

use thiserror::Error;

/// Why an inbound sequence failed to parse.
///
/// This never escapes the crate API: [`crate::codec::decode_response`] folds
/// every variant into `Response::Unrecognized`, because a malformed response
/// must never take the session down. The type exists so parse helpers can
/// use `?` internally.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("no known introducer/terminator pair")]
    UnknownIntroducer,
    #[error("OSC sequence is not a clipboard response")]
    NotClipboard,
    #[error("DCS sequence is not a capability report")]
    NotCapability,
    #[error("sequence body is truncated")]
    Truncated,
    #[error("sequence body is not valid UTF-8")]
    NotUtf8,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid hex field")]
    Hex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_human_readable() {
        assert_eq!(
            DecodeError::NotClipboard.to_string(),
            "OSC sequence is not a clipboard response"
        );
        assert_eq!(DecodeError::Hex.to_string(), "invalid hex field");
    }
}
