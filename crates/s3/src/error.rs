use thiserror::Error;

/// Failures talking to the S3-compatible endpoint, reduced to the
/// cases callers act on. Display strings stay operator-friendly; they
/// surface directly in API responses and CLI output.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not connect to endpoint: {0}")]
    Connection(String),

    #[error("The Access Key ID is invalid.")]
    InvalidAccessKey,

    #[error("The Secret Access Key is incorrect.")]
    SignatureMismatch,

    #[error("Bucket '{0}' does not exist.")]
    NoSuchBucket(String),

    #[error("Object '{0}' does not exist.")]
    NoSuchKey(String),

    #[error("Bucket is not empty and cannot be deleted. Please delete all contents first.")]
    BucketNotEmpty,

    #[error("An S3 client error occurred: {code}: {message}")]
    Api {
        code: String,
        message: String,
        status: u16,
    },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not parse S3 response: {0}")]
    Parse(String),

    #[error("S3 connection details are not configured.")]
    Unconfigured,
}

impl StoreError {
    /// Maps a decoded S3 `<Error>` body onto the taxonomy.
    pub fn from_api(code: String, message: String, status: u16, context: &str) -> Self {
        match code.as_str() {
            "InvalidAccessKeyId" => StoreError::InvalidAccessKey,
            "SignatureDoesNotMatch" => StoreError::SignatureMismatch,
            "NoSuchBucket" => StoreError::NoSuchBucket(context.to_string()),
            "NoSuchKey" => StoreError::NoSuchKey(context.to_string()),
            "BucketNotEmpty" => StoreError::BucketNotEmpty,
            _ => StoreError::Api {
                code,
                message,
                status,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_to_typed_variants() {
        let err = StoreError::from_api(
            "InvalidAccessKeyId".to_string(),
            "whatever".to_string(),
            403,
            "",
        );
        assert!(matches!(err, StoreError::InvalidAccessKey));

        let err = StoreError::from_api("NoSuchBucket".to_string(), "".to_string(), 404, "photos");
        assert!(matches!(err, StoreError::NoSuchBucket(b) if b == "photos"));

        let err = StoreError::from_api("BucketNotEmpty".to_string(), "".to_string(), 409, "");
        assert_eq!(
            err.to_string(),
            "Bucket is not empty and cannot be deleted. Please delete all contents first."
        );
    }

    #[test]
    fn test_unknown_code_keeps_details() {
        let err = StoreError::from_api(
            "SlowDown".to_string(),
            "Reduce your request rate.".to_string(),
            503,
            "",
        );
        match err {
            StoreError::Api {
                code,
                message,
                status,
            } => {
                assert_eq!(code, "SlowDown");
                assert_eq!(message, "Reduce your request rate.");
                assert_eq!(status, 503);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
