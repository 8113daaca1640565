//! HTTP response handlers.

use super::content::maybe_inject_hotreload;
use crate::utils::mime::types::{HTML, JAVASCRIPT, PLAIN};
use anyhow::{Context, Result, anyhow};
use std::{fs, path::Path};
use tiny_http::{Header, Method, Request, Response, StatusCode};

/// Respond with a file read fresh from disk.
pub fn respond_file(request: Request, path: &Path, live_reload: bool) -> Result<()> {
    let content_type = crate::utils::mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = maybe_inject_hotreload(body, content_type, live_reload);
    send_body(request, 200, content_type, body)
}

/// Respond with `404.html` from the output root, or plain text.
pub fn respond_not_found(request: Request, output: &Path, live_reload: bool) -> Result<()> {
    let custom_404 = output.join("404.html");
    let has_custom = custom_404.is_file();

    if is_head_request(&request) {
        let mime = if has_custom { HTML } else { PLAIN };
        return send_head(request, 404, mime);
    }

    if has_custom && let Ok(body) = fs::read(&custom_404) {
        let body = maybe_inject_hotreload(body, HTML, live_reload);
        return send_body(request, 404, HTML, body);
    }

    send_body(request, 404, PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 405 for anything but GET and HEAD.
pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(make_header("Content-Type", PLAIN)?)
        .with_header(make_header("Allow", "GET, HEAD")?);
    request.respond(response)?;
    Ok(())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, PLAIN, b"503 Service Unavailable".to_vec())
}

/// Respond with hotreload.js from memory.
pub fn respond_hotreload_js(request: Request, ws_port: u16) -> Result<()> {
    use crate::embed::serve::{HOTRELOAD_JS, HotreloadVars};

    if is_head_request(&request) {
        return send_head(request, 200, JAVASCRIPT);
    }
    let body = HOTRELOAD_JS.render(&HotreloadVars { ws_port });
    send_body(request, 200, JAVASCRIPT, body.into_bytes())
}

pub fn is_get_or_head(request: &Request) -> bool {
    matches!(request.method(), Method::Get | Method::Head)
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response = Response::empty(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type)?)
        .with_header(make_header("Cache-Control", "no-cache")?);
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Result<Header> {
    Header::from_bytes(key, value).map_err(|()| anyhow!("invalid header {key}: {value}"))
}
