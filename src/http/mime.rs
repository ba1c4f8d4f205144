//! Content-Type fallback for objects stored without one
//!
//! Blob backends such as a local directory keep no per-object metadata, so
//! the store adapter guesses from the key's extension instead.

/// Guess a Content-Type from the extension of an object key
///
/// # Examples
/// ```
/// use blobproxy::http::mime::guess_content_type;
/// assert_eq!(guess_content_type("site/index.html"), "text/html; charset=utf-8");
/// assert_eq!(guess_content_type("media/clip.MP4"), "video/mp4");
/// assert_eq!(guess_content_type("LICENSE"), "application/octet-stream");
/// ```
pub fn guess_content_type(key: &str) -> &'static str {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    let extension = file_name
        .rsplit_once('.')
        .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext);

    match extension.as_deref() {
        // Text
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv",

        // JavaScript/WASM
        Some("js" | "mjs") => "application/javascript",
        Some("json" | "map") => "application/json",
        Some("wasm") => "application/wasm",
        Some("webmanifest") => "application/manifest+json",

        // Images
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",

        // Video/Audio
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz" | "gzip") => "application/gzip",

        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(guess_content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(guess_content_type("css/site.css"), "text/css");
        assert_eq!(guess_content_type("js/app.js"), "application/javascript");
        assert_eq!(guess_content_type("img/logo.SVG"), "image/svg+xml");
        assert_eq!(guess_content_type("fonts/a.woff2"), "font/woff2");
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        assert_eq!(guess_content_type("data.xyz"), "application/octet-stream");
        assert_eq!(guess_content_type("Makefile"), "application/octet-stream");
        assert_eq!(guess_content_type(".hidden"), "application/octet-stream");
        assert_eq!(guess_content_type("dir.d/README"), "application/octet-stream");
        assert_eq!(guess_content_type(""), "application/octet-stream");
    }
}
