//! Development server
//!
//! Serves the build directory over HTTP and, when live reload is on,
//! injects a small client into every HTML page that listens on the
//! [`ReloadHub`] WebSocket port.

pub mod mime;
pub mod path;
pub mod reload;

pub use reload::{inject_client, ReloadEvent, ReloadHub};

use crate::error::{io_at, ExecutionError, ExecutionResult};
use crate::runner::Context;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

/// Ports tried after the configured one is taken
const MAX_PORT_RETRIES: u16 = 10;

/// How often the request loop checks for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Static file server over the build directory
pub struct DevServer {
    server: Server,
    addr: SocketAddr,
    root: PathBuf,
    reload_port: Option<u16>,
}

impl DevServer {
    /// Bind `host:port`, moving on to the next ports while they are taken
    pub fn bind(
        host: &str,
        port: u16,
        root: impl Into<PathBuf>,
        reload_port: Option<u16>,
    ) -> ExecutionResult<Self> {
        let mut last_error = String::new();

        for offset in 0..MAX_PORT_RETRIES {
            let candidate = port.saturating_add(offset);
            match Server::http((host, candidate)) {
                Ok(server) => {
                    let addr = server
                        .server_addr()
                        .to_ip()
                        .ok_or_else(|| ExecutionError::Server("not bound to an IP address".to_string()))?;
                    return Ok(DevServer {
                        server,
                        addr,
                        root: root.into(),
                        reload_port,
                    });
                }
                Err(e) => last_error = e.to_string(),
            }
        }

        Err(ExecutionError::Server(format!(
            "could not bind {} on ports {}-{}: {}",
            host,
            port,
            port.saturating_add(MAX_PORT_RETRIES - 1),
            last_error
        )))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Answer requests until `shutdown` is set
    pub fn run(&self, ctx: &Context, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::SeqCst) {
            match self.server.recv_timeout(POLL_INTERVAL) {
                Ok(Some(request)) => self.handle(ctx, request),
                Ok(None) => {}
                Err(e) => ctx.print_error(&format!("{} {}", self.prefix(ctx), e)),
            }
        }
    }

    fn prefix(&self, ctx: &Context) -> String {
        format!("[{}]", ctx.config.server.log_prefix)
    }

    fn handle(&self, ctx: &Context, request: Request) {
        let method = request.method().clone();
        let url = request.url().to_string();

        let (status, response) = match method {
            Method::Get | Method::Head => self.respond(&url),
            _ => (405, text_response(405, "Method Not Allowed")),
        };

        ctx.print_debug(&format!("{} {} {} {}", self.prefix(ctx), method, url, status));
        if let Err(e) = request.respond(response) {
            ctx.print_debug(&format!("{} {}: {}", self.prefix(ctx), url, e));
        }
    }

    fn respond(&self, url: &str) -> (u16, Response<std::io::Cursor<Vec<u8>>>) {
        let Some(file) = path::resolve_path(url, &self.root) else {
            return (404, text_response(404, "Not Found"));
        };

        match self.read_body(&file) {
            Ok((body, content_type)) => {
                let mut response = Response::from_data(body).with_status_code(200);
                if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
                    response.add_header(header);
                }
                if let Ok(header) = Header::from_bytes("Cache-Control", "no-cache") {
                    response.add_header(header);
                }
                (200, response)
            }
            Err(_) => (500, text_response(500, "Internal Server Error")),
        }
    }

    fn read_body(&self, file: &Path) -> ExecutionResult<(Vec<u8>, &'static str)> {
        let content_type = mime::from_path(file);
        let body = fs::read(file).map_err(io_at(file))?;

        let body = match self.reload_port {
            Some(port) if mime::is_html(content_type) => inject_client(&body, port),
            _ => body,
        };
        Ok((body, content_type))
    }
}

fn text_response(status: u16, text: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(text).with_status_code(StatusCode(status))
}

/// The `webserver` task: serve until Ctrl+C
pub fn serve(ctx: &Context) -> ExecutionResult<()> {
    let settings = &ctx.config.server;
    let root = ctx.resolve(&settings.base_dir);
    fs::create_dir_all(&root).map_err(io_at(&root))?;

    let shutdown = ctx.shutdown_flag();
    let reload_port = if settings.live_reload {
        let port = ctx
            .reload
            .listen(&settings.host, settings.reload_port, ctx.shutdown_flag())?;
        ctx.print_debug(&format!("[{}] live reload on port {}", settings.log_prefix, port));
        Some(port)
    } else {
        None
    };

    let server = DevServer::bind(&settings.host, settings.port, &root, reload_port)?;
    ctx.print_info(&format!(
        "[{}] serving {} at http://{}",
        settings.log_prefix,
        root.display(),
        server.addr()
    ));

    server.run(ctx, &shutdown);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Verbosity;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;
    use tempfile::TempDir;

    fn get(addr: SocketAddr, request_line: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        write!(
            stream,
            "{} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            request_line
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serves_files_and_injects_client() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<body>hi</body>").unwrap();
        fs::write(dir.path().join("app.css"), "a{}").unwrap();

        let ctx = Context::default().with_verbosity(Verbosity::Silent);
        let server = DevServer::bind("127.0.0.1", 0, dir.path(), Some(35729)).unwrap();
        let addr = server.addr();
        let shutdown = AtomicBool::new(false);

        thread::scope(|scope| {
            scope.spawn(|| server.run(&ctx, &shutdown));

            let page = get(addr, "GET /");
            assert!(page.starts_with("HTTP/1.1 200"), "{}", page);
            assert!(page.contains("text/html"));
            assert!(page.contains("hi<script>"));

            let css = get(addr, "GET /app.css");
            assert!(css.contains("text/css"));
            assert!(!css.contains("<script>"));

            assert!(get(addr, "GET /missing.html").starts_with("HTTP/1.1 404"));
            assert!(get(addr, "POST /").starts_with("HTTP/1.1 405"));

            shutdown.store(true, Ordering::SeqCst);
        });
    }

    #[test]
    fn test_no_injection_without_live_reload() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<body>hi</body>").unwrap();

        let server = DevServer::bind("127.0.0.1", 0, dir.path(), None).unwrap();
        let (body, content_type) = server.read_body(&dir.path().join("index.html")).unwrap();
        assert_eq!(content_type, mime::HTML);
        assert_eq!(body, b"<body>hi</body>");
    }
}
