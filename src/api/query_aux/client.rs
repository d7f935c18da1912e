use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client as HttpClient;
use serde_json::Value;
use tracing::{debug, warn};

use super::models::{FetchError, QueryParams, Timeout};

/// Client for the flotation analytics `query-aux` endpoint
pub struct QueryAuxClient {
    http_client: HttpClient,
    base_url: String,
}

impl QueryAuxClient {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://spmflotacionprod.azurewebsites.net/visualization/query-aux";

    /// Create a client for the production endpoint
    pub fn new(timeout: Timeout) -> Result<Self, FetchError> {
        Self::with_base_url(Self::DEFAULT_BASE_URL.to_string(), timeout)
    }

    /// Create a client for a custom base URL
    pub fn with_base_url(base_url: String, timeout: Timeout) -> Result<Self, FetchError> {
        let http_client = HttpClient::builder()
            .default_headers(Self::create_headers())
            .connect_timeout(timeout.connect())
            .timeout(timeout.request())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn create_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// GET the endpoint and decode the body as JSON.
    ///
    /// One attempt only. A 4xx/5xx answer becomes `FetchError::Http` carrying
    /// the status and body; transport failures are split into
    /// `FetchError::Timeout` and `FetchError::Connection`.
    pub async fn fetch(&self, params: Option<&QueryParams>) -> Result<Value, FetchError> {
        debug!(
            "GET {} ({} query params)",
            self.base_url,
            params.map(|p| p.len()).unwrap_or(0)
        );

        let mut request = self.http_client.get(&self.base_url);
        if let Some(params) = params {
            request = request.query(params);
        }

        let response = request.send().await.map_err(FetchError::from_transport)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("query-aux answered {}: {}", status.as_u16(), body);
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(FetchError::from_transport)
    }
}

/// Fetch the `query-aux` payload with a one-off client
pub async fn fetch_query_aux(
    base_url: &str,
    params: Option<&QueryParams>,
    timeout: Timeout,
) -> Result<Value, FetchError> {
    QueryAuxClient::with_base_url(base_url.to_string(), timeout)?
        .fetch(params)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned response and hand back the raw request text
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
        delay: Duration,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&buf).to_string());

            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        (format!("http://{}/visualization/query-aux", addr), rx)
    }

    #[tokio::test]
    async fn test_fetch_returns_payload() {
        let (url, _rx) = serve_once("200 OK", r#"{"a": 1}"#, Duration::ZERO).await;

        let payload = fetch_query_aux(&url, None, Timeout::default()).await.unwrap();

        assert_eq!(payload, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_fetch_sends_accept_header_and_params() {
        let (url, rx) = serve_once("200 OK", "[]", Duration::ZERO).await;
        let params = QueryParams::new().with("tag", "FIC-101").with("limit", 5i64);

        let payload = fetch_query_aux(&url, Some(&params), Timeout::default())
            .await
            .unwrap();
        let request = rx.await.unwrap().to_lowercase();

        assert_eq!(payload, serde_json::json!([]));
        assert!(request.starts_with("get /visualization/query-aux?tag=fic-101&limit=5 "));
        assert!(request.contains("accept: application/json"));
    }

    #[tokio::test]
    async fn test_fetch_surfaces_http_status() {
        let (url, _rx) = serve_once("404 Not Found", r#"{"detail": "missing"}"#, Duration::ZERO).await;

        let err = fetch_query_aux(&url, None, Timeout::default()).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        match err {
            FetchError::Http { body, .. } => assert!(body.contains("missing")),
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let (url, _rx) = serve_once("200 OK", "{}", Duration::from_secs(5)).await;

        let err = fetch_query_aux(&url, None, Timeout::Total(Duration::from_millis(200)))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_times_out_with_split_timeout() {
        let (url, _rx) = serve_once("200 OK", "{}", Duration::from_secs(5)).await;
        let timeout = Timeout::from((Duration::from_millis(500), Duration::from_millis(200)));

        let started = std::time::Instant::now();
        let err = fetch_query_aux(&url, None, timeout).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_fetch_split_timeout_allows_slow_read_within_bound() {
        let (url, _rx) = serve_once("200 OK", r#"{"ok": true}"#, Duration::from_millis(300)).await;
        let timeout = Timeout::from((Duration::from_secs(1), Duration::from_secs(2)));

        let payload = fetch_query_aux(&url, None, timeout).await.unwrap();

        assert_eq!(payload, serde_json::json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_json() {
        let (url, _rx) = serve_once("200 OK", "not json", Duration::ZERO).await;

        let err = fetch_query_aux(&url, None, Timeout::default()).await.unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetch_query_aux(&format!("http://{}/", addr), None, Timeout::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Connection(_)), "got {:?}", err);
    }
}
