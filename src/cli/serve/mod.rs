//! Development server with live reload support.
//!
//! Files are read from the output directory on every request. In watch
//! mode the actor system runs on its own thread next to the request loop.

mod content;
mod lifecycle;
mod path;
mod response;

use crate::{
    actor::Coordinator,
    cli::build::initial_build,
    config::{SiteConfig, cfg},
    embed::serve::HOTRELOAD_URL,
    log,
};
use anyhow::Result;
use crossbeam::channel;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Number of request worker threads.
const REQUEST_WORKERS: usize = 4;

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown_rx: channel::Receiver<()>,
}

/// Bind the HTTP server without starting the request loop.
///
/// Requests arriving before `run` wait in the listen queue.
pub fn bind_server(config: &SiteConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    lifecycle::register_server_for_shutdown(Arc::clone(&server), shutdown_tx);

    Ok(BoundServer {
        server,
        addr,
        shutdown_rx,
    })
}

/// `serve`: static file server over the current output directory.
pub fn serve_site(config: &SiteConfig) -> Result<()> {
    let bound = bind_server(config)?;
    log!("serve"; "http://{}", bound.addr());
    bound.run(None, None)
}

/// `watch`: watcher first, then initial build, then serve and rebuild.
pub fn watch_site(config: Arc<SiteConfig>) -> Result<()> {
    let bound = bind_server(&config)?;

    // Watcher is attached before building so no edit is missed
    let coordinator = Coordinator::new(Arc::clone(&config), config.serve.live_reload)?;
    let ws_port = coordinator.ws_port();

    let run = initial_build(&config)?;
    let coordinator = coordinator.with_initial_build(&run, &config);

    log!("serve"; "http://{}", bound.addr());
    bound.run(Some(coordinator), ws_port)
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the request loop (blocking).
    pub fn run(self, coordinator: Option<Coordinator>, ws_port: Option<u16>) -> Result<()> {
        let actor_handle = coordinator.map(|c| lifecycle::spawn_actors(c, self.shutdown_rx));
        let result = run_request_loop(&self.server, ws_port);
        lifecycle::wait_for_shutdown(actor_handle);
        result
    }
}

fn run_request_loop(server: &Server, ws_port: Option<u16>) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_WORKERS)
        .build()?;

    for request in server.incoming_requests() {
        pool.spawn(move || {
            let config = cfg();
            if let Err(e) = handle_request(request, config.output_dir(), ws_port) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Handle a single HTTP request against `output`.
fn handle_request(request: Request, output: &Path, ws_port: Option<u16>) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    if !response::is_get_or_head(&request) {
        return response::respond_method_not_allowed(request);
    }

    // Serve hotreload.js from memory, it never lands in the output directory
    if let Some(port) = ws_port
        && path::url_path(request.url()) == HOTRELOAD_URL
    {
        return response::respond_hotreload_js(request, port);
    }

    let live_reload = ws_port.is_some();
    if let Some(path) = path::resolve_path(request.url(), output) {
        return response::respond_file(request, &path, live_reload);
    }

    response::respond_not_found(request, output, live_reload)
}
