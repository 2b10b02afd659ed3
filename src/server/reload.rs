//! Live reload over WebSocket
//!
//! Browsers connect to a small WebSocket listener on its own port. Each
//! listener gets a bounded queue drained by its own delivery thread, so
//! publishing never waits on a browser. Delivery is best effort: a full
//! queue drops the event, and a listener whose socket fails is removed on
//! the next publish.

use crate::error::{ExecutionError, ExecutionResult};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::ErrorKind;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tungstenite::{Message, WebSocket};

/// Ports tried after the configured one is taken
const MAX_PORT_RETRIES: u16 = 10;

/// A connection that has not completed the handshake by then is dropped
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Writes to a stalled browser give up after this long
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Events buffered per listener
const QUEUE_DEPTH: usize = 16;

const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Message sent to browsers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadEvent {
    /// Reload the whole page
    Reload { source: String },
    /// Re-fetch stylesheets in place
    Css,
}

impl ReloadEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

/// Set of connected live-reload listeners
#[derive(Clone, Default)]
pub struct ReloadHub {
    clients: Arc<Mutex<Vec<Sender<Message>>>>,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Complete the WebSocket handshake and register the listener
    pub fn add_client(&self, stream: TcpStream) -> ExecutionResult<()> {
        let socket_error = |e: std::io::Error| ExecutionError::Server(e.to_string());
        stream
            .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
            .map_err(socket_error)?;
        stream
            .set_write_timeout(Some(WRITE_TIMEOUT))
            .map_err(socket_error)?;

        let ws = tungstenite::accept(stream)
            .map_err(|e| ExecutionError::Server(format!("handshake failed: {}", e)))?;

        let (tx, rx) = channel::bounded(QUEUE_DEPTH);
        thread::spawn(move || deliver(ws, rx));
        self.clients.lock().push(tx);
        Ok(())
    }

    /// Queue `event` for every listener, returning how many accepted it
    ///
    /// Never blocks. With no listeners the event is dropped.
    pub fn publish(&self, event: &ReloadEvent) -> usize {
        let mut clients = self.clients.lock();
        if clients.is_empty() {
            return 0;
        }

        let message = Message::text(event.to_json());
        let mut queued = 0;
        clients.retain(|tx| match tx.try_send(message.clone()) {
            Ok(()) => {
                queued += 1;
                true
            }
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
        queued
    }

    /// Accept listeners on `host:port` until `shutdown` is set
    ///
    /// The next ports are tried when `port` is taken. Returns the bound port.
    pub fn listen(&self, host: &str, port: u16, shutdown: Arc<AtomicBool>) -> ExecutionResult<u16> {
        let (listener, bound) = try_bind_port(host, port)?;
        listener
            .set_nonblocking(true)
            .map_err(|e| ExecutionError::Server(e.to_string()))?;

        let hub = self.clone();
        thread::spawn(move || {
            while !shutdown.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        // one thread per handshake so a silent peer cannot stall accepting
                        let hub = hub.clone();
                        thread::spawn(move || {
                            if stream.set_nonblocking(false).is_ok() {
                                let _ = hub.add_client(stream);
                            }
                        });
                    }
                    Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                    Err(_) => thread::sleep(ACCEPT_POLL * 5),
                }
            }

            // dropping the senders closes every listener
            hub.clients.lock().clear();
        });

        Ok(bound)
    }
}

/// Write queued events to one browser until it fails or the hub lets go
fn deliver(mut ws: WebSocket<TcpStream>, events: Receiver<Message>) {
    for message in events.iter() {
        if ws.send(message).is_err() {
            return;
        }
    }
    let _ = ws.close(None);
    let _ = ws.flush();
}

fn try_bind_port(host: &str, base_port: u16) -> ExecutionResult<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((host, port)) {
            Ok(listener) => {
                let bound = listener
                    .local_addr()
                    .map_err(|e| ExecutionError::Server(e.to_string()))?
                    .port();
                return Ok((listener, bound));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(ExecutionError::Server(format!(
        "live reload could not bind ports {}-{}: {}",
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Browser side of the protocol
fn client_script(port: u16) -> String {
    format!(
        concat!(
            "<script>(function(){{",
            "var ws=new WebSocket('ws://'+location.hostname+':{}');",
            "ws.onmessage=function(e){{var m=JSON.parse(e.data);",
            "if(m.type==='css'){{document.querySelectorAll('link[rel=\"stylesheet\"]').forEach(function(l){{",
            "var u=new URL(l.href);u.searchParams.set('livereload',Date.now());l.href=u.href;}});}}",
            "else{{location.reload();}}}};",
            "}})();</script>"
        ),
        port
    )
}

/// Insert the client script before the last `</body>`, or append it
pub fn inject_client(body: &[u8], port: u16) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";
    let script = client_script(port);

    let position = body
        .windows(PATTERN.len())
        .rposition(|window| window.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(body.len());

    let mut result = Vec::with_capacity(body.len() + script.len());
    result.extend_from_slice(&body[..position]);
    result.extend_from_slice(script.as_bytes());
    result.extend_from_slice(&body[position..]);
    result
}
