use thiserror::Error;

/// Errors produced while decoding backend payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// None of the accepted envelopes carried the expected payload.
    #[error("Missing {0} payload")]
    MissingPayload(&'static str),

    /// The top-level shape was not one we know how to read.
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            CodecError::MissingPayload("recipe_save").to_string(),
            "Missing recipe_save payload"
        );
    }
}
