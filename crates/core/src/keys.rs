use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid object key path: '{0}'")]
    InvalidPath(String),
}

/// Cleans a client-supplied object key before upload.
///
/// Browsers may send backslash separators and stray whitespace around
/// path segments, and a hostile client may send traversal segments.
/// The key is split on `/` after normalizing backslashes, each segment
/// is trimmed, and empty, `.` or `..` segments reject the whole key.
pub fn sanitize_object_key(raw: &str) -> Result<String, KeyError> {
    let normalized = raw.replace('\\', "/");

    let mut clean_parts = Vec::new();
    for part in normalized.split('/') {
        let clean = part.trim();
        if clean.is_empty() || clean == "." || clean == ".." {
            return Err(KeyError::InvalidPath(raw.to_string()));
        }
        clean_parts.push(clean);
    }

    if clean_parts.is_empty() {
        return Err(KeyError::InvalidPath(raw.to_string()));
    }

    Ok(clean_parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_key_passes_through() {
        assert_eq!(sanitize_object_key("report.pdf").unwrap(), "report.pdf");
    }

    #[test]
    fn test_nested_key_preserved() {
        assert_eq!(
            sanitize_object_key("2024/q1/report.pdf").unwrap(),
            "2024/q1/report.pdf"
        );
    }

    #[test]
    fn test_backslashes_normalized() {
        assert_eq!(
            sanitize_object_key("folder\\sub\\file.txt").unwrap(),
            "folder/sub/file.txt"
        );
    }

    #[test]
    fn test_segment_whitespace_trimmed() {
        assert_eq!(
            sanitize_object_key(" folder / file.txt ").unwrap(),
            "folder/file.txt"
        );
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(sanitize_object_key("../etc/passwd").is_err());
        assert!(sanitize_object_key("a/../b").is_err());
        assert!(sanitize_object_key("a/./b").is_err());
    }

    #[test]
    fn test_empty_segments_rejected() {
        assert!(sanitize_object_key("").is_err());
        assert!(sanitize_object_key("a//b").is_err());
        assert!(sanitize_object_key("folder/").is_err());
        assert!(sanitize_object_key("/folder").is_err());
    }

    #[test]
    fn test_whitespace_only_segment_rejected() {
        assert!(sanitize_object_key("a/   /b").is_err());
    }
}
