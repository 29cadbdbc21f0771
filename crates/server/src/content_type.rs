/// Guesses a Content-Type for an object key from its extension.
///
/// Covers the types this service commonly stores; `.jsonl` maps to
/// JSON deliberately (line-delimited exports were previously uploaded
/// as octet-stream and became undownloadable in browsers). Everything
/// unknown stays `application/octet-stream`.
pub fn guess_content_type(key: &str) -> &'static str {
    let filename = key.rsplit('/').next().unwrap_or(key);
    let extension = match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => return "application/octet-stream",
    };

    match extension.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" | "jsonl" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}
