//! Minimal HTTP/1.1 server that accepts multipart POST uploads for
//! integration tests.
//!
//! Reads the full request (headers + Content-Length body), optionally holds
//! the connection open for a scripted delay, then answers with a scripted
//! status/body. Tracks connection concurrency so tests can assert the
//! client-side bound, and captures request bodies for form-content checks.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct UploadServerOptions {
    /// Status and body for requests that do not match `fail_marker`.
    pub status: u16,
    pub body: String,
    /// Hold the connection this long after reading the request.
    pub delay: Duration,
    /// When set, requests whose body contains this marker get the failure
    /// reply instead (lets one server produce mixed outcomes per file name).
    pub fail_marker: Option<String>,
    pub fail_status: u16,
    pub fail_body: String,
}

impl Default for UploadServerOptions {
    fn default() -> Self {
        Self {
            status: 200,
            body: r#"{"success":true,"result":{"id":1}}"#.to_string(),
            delay: Duration::ZERO,
            fail_marker: None,
            fail_status: 500,
            fail_body: r#"{"error":"injected failure"}"#.to_string(),
        }
    }
}

#[derive(Default)]
pub struct ServerStats {
    pub hits: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    pub bodies: Mutex<Vec<Vec<u8>>>,
}

impl ServerStats {
    /// High-water mark of simultaneously handled requests.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Starts a server in a background thread. Returns the upload URL and the
/// shared stats. The server runs until the process exits.
pub fn start(opts: UploadServerOptions) -> (String, Arc<ServerStats>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(ServerStats::default());
    let stats_out = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let opts = opts.clone();
            let stats = Arc::clone(&stats);
            thread::spawn(move || handle(stream, &opts, &stats));
        }
    });
    (format!("http://127.0.0.1:{}/upload", port), stats_out)
}

fn handle(mut stream: std::net::TcpStream, opts: &UploadServerOptions, stats: &ServerStats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(30)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    stats.enter();
    let body = read_request(&mut stream);
    if let Some(body) = body {
        let failed = opts
            .fail_marker
            .as_deref()
            .is_some_and(|marker| contains(&body, marker.as_bytes()));
        stats.bodies.lock().unwrap().push(body);
        if !opts.delay.is_zero() {
            thread::sleep(opts.delay);
        }
        let (status, reply) = if failed {
            (opts.fail_status, opts.fail_body.as_str())
        } else {
            (opts.status, opts.body.as_str())
        };
        let response = format!(
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reply.len(),
            reply
        );
        let _ = stream.write_all(response.as_bytes());
    }
    stats.leave();
}

/// Read headers then exactly Content-Length body bytes. Returns the body,
/// or None when the request is malformed or the client hung up.
fn read_request(stream: &mut std::net::TcpStream) -> Option<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length: usize = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0);
    let mut body: Vec<u8> = buf[header_end..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }
    Some(body)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}
