//! MIME type detection for the dev server.

use std::path::Path;

/// Common MIME type constants.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const MANIFEST: &str = "application/manifest+json";
    pub const XML: &str = "application/xml";
    pub const MAP: &str = "application/json";
    pub const OCTET_STREAM: &str = "application/octet-stream";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const AVIF: &str = "image/avif";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
    pub const EOT: &str = "application/vnd.ms-fontobject";
}

/// Guess MIME type from file extension.
pub fn from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    from_extension(ext.as_deref())
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        Some("map") => types::MAP,
        Some("webmanifest") => types::MANIFEST,
        Some("xml") => types::XML,
        Some("txt") => types::PLAIN,

        Some("svg") => types::SVG,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("avif") => types::AVIF,
        Some("ico") => types::ICO,

        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf") => types::TTF,
        Some("otf") => types::OTF,
        Some("eot") => types::EOT,

        _ => types::OCTET_STREAM,
    }
}

/// Check if the MIME type is an HTML document.
pub fn is_html(mime: &str) -> bool {
    mime.starts_with("text/html")
}
