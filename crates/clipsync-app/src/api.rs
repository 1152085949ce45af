// HTTP client for the companion server's playlist and control endpoints.
//
// Both requests are credentialed: the caller passes the current session
// cookie explicitly and it is attached as a `Cookie` header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use clipsync_core::protocol::{ControlReport, Video};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server returned status {0}")]
    Status(StatusCode),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// ServerApi
// ---------------------------------------------------------------------------

/// The two HTTP calls the client makes. `cookie` is a ready-made `Cookie`
/// header value (`session_id=...`), or `None` before a session exists.
#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn fetch_playlist(&self, url: &str, cookie: Option<&str>) -> Result<Vec<Video>, ApiError>;

    async fn post_control(
        &self,
        url: &str,
        report: &ControlReport,
        cookie: Option<&str>,
    ) -> Result<(), ApiError>;
}

/// `ServerApi` backed by reqwest.
pub struct HttpApi {
    http: reqwest::Client,
}

impl HttpApi {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ServerApi for HttpApi {
    async fn fetch_playlist(&self, url: &str, cookie: Option<&str>) -> Result<Vec<Video>, ApiError> {
        let mut request = self.http.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let body = response.text().await?;
        debug!("GET {url} -> {status} ({} bytes)", body.len());
        parse_playlist(&body)
    }

    async fn post_control(
        &self,
        url: &str,
        report: &ControlReport,
        cookie: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut request = self.http.post(url).json(report);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }
        debug!("POST {url} seq={} -> {status}", report.seq);
        Ok(())
    }
}

/// Parse a `GET /videos` body: a JSON array of `{url, name}`.
pub fn parse_playlist(body: &str) -> Result<Vec<Video>, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Path component of `url`, used for cookie path matching.
pub fn request_path(url: &str) -> &str {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = match after_scheme.find('/') {
        Some(idx) => &after_scheme[idx..],
        None => "/",
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_core::protocol::{TransportAction, TransportEvent};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one HTTP/1.1 request, answer with `status_line`, and return the
    /// raw request head and body.
    async fn serve_once(listener: TcpListener, status_line: &'static str) -> (String, String) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let (head, body_start) = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break (String::from_utf8_lossy(&buf[..pos]).to_lowercase(), pos + 4);
            }
        };
        let content_length: usize = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);
        while buf.len() < body_start + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending the body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = &buf[body_start..body_start + content_length];
        let body = String::from_utf8_lossy(body).into_owned();

        let response =
            format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        socket.write_all(response.as_bytes()).await.unwrap();
        (head, body)
    }

    fn play_report() -> ControlReport {
        ControlReport {
            event: TransportEvent {
                action: TransportAction::Play,
                time: 12.5,
                video_name: "B".into(),
            },
            seq: 7,
        }
    }

    #[tokio::test]
    async fn post_control_sends_json_with_cookie() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/audio-control", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener, "204 No Content"));

        let api = HttpApi::new(Duration::from_secs(5)).unwrap();
        api.post_control(&url, &play_report(), Some("session_id=abc123"))
            .await
            .unwrap();

        let (head, body) = server.await.unwrap();
        assert!(head.starts_with("post /audio-control "));
        assert!(head.contains("content-type: application/json"));
        assert!(head.contains("cookie: session_id=abc123"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"action": "play", "time": 12.5, "videoName": "B", "seq": 7})
        );
    }

    #[tokio::test]
    async fn post_control_non_2xx_is_status_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/audio-control", listener.local_addr().unwrap());
        let server = tokio::spawn(serve_once(listener, "500 Internal Server Error"));

        let api = HttpApi::new(Duration::from_secs(5)).unwrap();
        let err = api.post_control(&url, &play_report(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR)));

        let (head, _) = server.await.unwrap();
        assert!(!head.contains("cookie:"));
    }

    #[test]
    fn parse_playlist_accepts_array() {
        let videos = parse_playlist(
            r#"[{"name":"a.mp4","url":"http://localhost:8000/videos/a.mp4"}]"#,
        )
        .unwrap();
        assert_eq!(
            videos,
            vec![Video::new("http://localhost:8000/videos/a.mp4", "a.mp4")]
        );
    }

    #[test]
    fn parse_playlist_accepts_empty_array() {
        assert!(parse_playlist("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_playlist_rejects_non_json() {
        let err = parse_playlist("<html>Internal Server Error</html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn parse_playlist_rejects_error_object() {
        let err = parse_playlist(r#"{"detail":"boom"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn request_path_extraction() {
        assert_eq!(request_path("http://localhost:8000/videos"), "/videos");
        assert_eq!(request_path("http://localhost:8000"), "/");
        assert_eq!(request_path("https://h/a/b?x=1#f"), "/a/b");
        assert_eq!(request_path("/audio-control"), "/audio-control");
    }

    #[test]
    fn status_error_message() {
        let err = ApiError::Status(StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "server returned status 404 Not Found");
    }
}
