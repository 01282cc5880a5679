//! Ephemeral Content Server: serves the extracted site over loopback HTTP
//! for the duration of a scan.

use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::thread::JoinHandle;

use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Request;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::Result;
use crate::ScanError;
use crate::ServerConfig;

/// Static file server bound to an OS-assigned loopback port.
///
/// One accept thread receives requests and hands each to a short-lived
/// handler thread. `stop` is idempotent and also runs on drop.
///
/// # Examples
///
/// ```no_run
/// use a11yscan_core::ServerConfig;
/// use a11yscan_core::server::ContentServer;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut server = ContentServer::new(ServerConfig::default());
/// let base_url = server.start(Path::new("data/scan"))?;
/// println!("serving at {base_url}");
/// server.stop();
/// # Ok(())
/// # }
/// ```
pub struct ContentServer {
    config: ServerConfig,
    running: Option<RunningServer>,
}

struct RunningServer {
    base_url: String,
    server: Arc<Server>,
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    done: mpsc::Receiver<()>,
}

impl std::fmt::Debug for ContentServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentServer")
            .field("config", &self.config)
            .field("base_url", &self.base_url())
            .finish_non_exhaustive()
    }
}

impl ContentServer {
    /// Creates a stopped server.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    /// Starts serving `directory` and returns the base URL
    /// (`http://127.0.0.1:<port>`).
    ///
    /// Calling `start` on a running server logs a warning and returns the
    /// existing base URL; no second port is bound.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Server` if the directory is missing or the socket
    /// cannot be bound, and `ScanError::Io` if the accept thread cannot be
    /// spawned.
    pub fn start(&mut self, directory: &Path) -> Result<String> {
        if let Some(running) = &self.running {
            warn!(base_url = %running.base_url, "server is already running, ignoring start request");
            return Ok(running.base_url.clone());
        }

        let root = directory.canonicalize().map_err(|e| {
            ScanError::Server(format!("cannot serve {}: {e}", directory.display()))
        })?;
        if !root.is_dir() {
            return Err(ScanError::Server(format!(
                "cannot serve {}: not a directory",
                root.display()
            )));
        }

        let server = Server::http((self.config.host.as_str(), 0))
            .map_err(|e| ScanError::Server(format!("failed to bind {}: {e}", self.config.host)))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| ScanError::Server("listener has no IP address".to_string()))?;
        let base_url = format!("http://{}:{port}", self.config.host);

        let server = Arc::new(server);
        let shutdown = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = mpsc::channel();

        let handle = {
            let server = Arc::clone(&server);
            let shutdown = Arc::clone(&shutdown);
            let poll_interval = self.config.poll_interval;
            thread::Builder::new()
                .name("a11yscan-http".to_string())
                .spawn(move || {
                    accept_loop(&server, &shutdown, poll_interval, &root);
                    let _ = done_tx.send(());
                })?
        };

        info!(%base_url, directory = %directory.display(), "content server started");
        self.running = Some(RunningServer {
            base_url: base_url.clone(),
            server,
            shutdown,
            handle,
            done,
        });
        Ok(base_url)
    }

    /// Stops the server and waits up to `ServerConfig::shutdown_timeout` for
    /// the accept thread to exit; after that the thread is detached.
    ///
    /// Safe to call when the server was never started or is already stopped.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        info!(base_url = %running.base_url, "shutting down content server");
        running.shutdown.store(true, Ordering::SeqCst);
        running.server.unblock();

        match running.done.recv_timeout(self.config.shutdown_timeout) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                if running.handle.join().is_err() {
                    error!("content server thread panicked");
                }
                info!("content server shut down");
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                error!(
                    timeout = ?self.config.shutdown_timeout,
                    "content server thread did not shut down cleanly, detaching"
                );
            }
        }
    }

    /// Base URL while running.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.running.as_ref().map(|r| r.base_url.as_str())
    }

    /// Returns `true` between `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Default for ContentServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl Drop for ContentServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(server: &Server, shutdown: &AtomicBool, poll_interval: std::time::Duration, root: &Path) {
    while !shutdown.load(Ordering::SeqCst) {
        let request = match server.recv_timeout(poll_interval) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                if !shutdown.load(Ordering::SeqCst) {
                    error!(error = %e, "content server accept failed");
                }
                break;
            }
        };

        let root = root.to_path_buf();
        let spawned = thread::Builder::new()
            .name("a11yscan-http-req".to_string())
            .spawn(move || handle_request(&root, request));
        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn request handler");
        }
    }
    debug!("content server accept loop exited");
}

fn handle_request(root: &Path, request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let outcome = if !matches!(method, Method::Get | Method::Head) {
        request.respond(Response::empty(StatusCode(405)))
    } else {
        match resolve(root, &url) {
            Resolved::File(path) => match File::open(&path) {
                Ok(file) => {
                    let mut response = Response::from_file(file);
                    if let Ok(header) = Header::from_bytes("Content-Type", content_type(&path)) {
                        response = response.with_header(header);
                    }
                    request.respond(response)
                }
                Err(_) => request.respond(Response::empty(StatusCode(404))),
            },
            Resolved::Redirect(location) => {
                let mut response = Response::empty(StatusCode(301));
                if let Ok(header) = Header::from_bytes("Location", location.as_bytes()) {
                    response = response.with_header(header);
                }
                request.respond(response)
            }
            Resolved::NotFound => request.respond(Response::empty(StatusCode(404))),
        }
    };

    debug!(%method, %url, "served request");
    if let Err(e) = outcome {
        debug!(%url, error = %e, "client went away before response completed");
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Resolved {
    File(PathBuf),
    Redirect(String),
    NotFound,
}

/// Maps a request URL onto a file below `root`.
fn resolve(root: &Path, url: &str) -> Resolved {
    let raw_path = url.split(['?', '#']).next().unwrap_or_default();
    let Some(decoded) = percent_decode(raw_path) else {
        return Resolved::NotFound;
    };

    let mut path = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Resolved::NotFound,
            s if s.contains(['\\', '\0', ':']) => return Resolved::NotFound,
            s => path.push(s),
        }
    }

    let Ok(canonical) = path.canonicalize() else {
        return Resolved::NotFound;
    };
    if !canonical.starts_with(root) {
        return Resolved::NotFound;
    }

    if canonical.is_dir() {
        if !raw_path.ends_with('/') {
            return Resolved::Redirect(format!("{raw_path}/"));
        }
        let index = canonical.join("index.html");
        return if index.is_file() {
            Resolved::File(index)
        } else {
            Resolved::NotFound
        };
    }

    if canonical.is_file() {
        Resolved::File(canonical)
    } else {
        Resolved::NotFound
    }
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
