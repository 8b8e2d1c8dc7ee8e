//! Live-view HTTP surface.
//!
//! A deliberately small server on the standard library's `TcpListener`:
//!
//! - `GET /health` - liveness probe
//! - `GET /streams/<id>/live` - latest annotated JPEG for a stream
//! - `GET /streams/<id>/detect` - run one detection cycle now, return the report
//!
//! Viewers polling `/live` read the cache on their own cadence and simply see
//! the same frame again until the stream's supervisor publishes the next one.
//! Before the first completed cycle the endpoint answers 404 `no_frame_yet`;
//! callers are expected to wait and retry rather than treat it as an error.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::supervisor::DetectionEngine;
use crate::StreamSource;

const MAX_REQUEST_BYTES: usize = 8192;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8890".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    engine: Arc<DetectionEngine>,
    streams: HashMap<u32, StreamSource>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, engine: Arc<DetectionEngine>, streams: &[StreamSource]) -> Self {
        Self {
            cfg,
            engine,
            streams: streams.iter().map(|s| (s.id, s.clone())).collect(),
        }
    }

    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown_thread = shutdown.clone();
        let join = std::thread::Builder::new()
            .name("live-api".to_string())
            .spawn(move || {
                if let Err(err) = run_api(listener, self.engine, self.streams, shutdown_thread) {
                    log::error!("live api stopped: {}", err);
                }
            })?;

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    engine: Arc<DetectionEngine>,
    streams: HashMap<u32, StreamSource>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, &engine, &streams) {
                    log::warn!("live api request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(
    mut stream: TcpStream,
    engine: &Arc<DetectionEngine>,
    streams: &HashMap<u32, StreamSource>,
) -> Result<()> {
    let request = read_request(&mut stream)?;
    if request.method != "GET" {
        write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#)?;
        return Ok(());
    }

    if request.path == "/health" {
        write_json_response(&mut stream, 200, r#"{"status":"ok"}"#)?;
        return Ok(());
    }

    match parse_stream_route(&request.path) {
        Some((stream_id, "live")) => {
            match engine.cache.read(stream_id) {
                Some(frame) => {
                    write_response(&mut stream, 200, "image/jpeg", &frame.jpeg)?;
                }
                None if streams.contains_key(&stream_id) => {
                    write_json_response(&mut stream, 404, r#"{"error":"no_frame_yet"}"#)?;
                }
                None => {
                    write_json_response(&mut stream, 404, r#"{"error":"unknown_stream"}"#)?;
                }
            }
            Ok(())
        }
        Some((stream_id, "detect")) => {
            let Some(source) = streams.get(&stream_id) else {
                write_json_response(&mut stream, 404, r#"{"error":"unknown_stream"}"#)?;
                return Ok(());
            };
            match engine.run_cycle(source) {
                Ok(report) => {
                    let payload = serde_json::to_vec(&report)?;
                    write_response(&mut stream, 200, "application/json", &payload)?;
                }
                Err(failure) => {
                    log::warn!("stream {}: on-demand cycle failed: {}", stream_id, failure);
                    let body = format!(r#"{{"error":"{}"}}"#, failure.kind);
                    write_json_response(&mut stream, 502, &body)?;
                }
            }
            Ok(())
        }
        _ => {
            write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#)?;
            Ok(())
        }
    }
}

/// `/streams/<id>/<action>` -> (id, action)
fn parse_stream_route(path: &str) -> Option<(u32, &str)> {
    let rest = path.strip_prefix("/streams/")?;
    let (id, action) = rest.split_once('/')?;
    let id: u32 = id.parse().ok()?;
    Some((id, action))
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if data.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&data);
    let request_line = text
        .split("\r\n")
        .next()
        .ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        502 => "HTTP/1.1 502 Bad Gateway",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_routes_parse() {
        assert_eq!(parse_stream_route("/streams/101/live"), Some((101, "live")));
        assert_eq!(
            parse_stream_route("/streams/7/detect"),
            Some((7, "detect"))
        );
        assert_eq!(parse_stream_route("/streams/abc/live"), None);
        assert_eq!(parse_stream_route("/health"), None);
        assert_eq!(parse_stream_route("/streams/101"), None);
    }
}
