//! Request dispatch to the LCD REST gateway
//!
//! Everything that talks to the node goes through one [`Dispatcher`].
//! [`HttpDispatcher`] is the production implementation; tests and custom
//! HTTP stacks plug in their own.

use crate::config::TransportConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use lcd_log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Query string pairs appended to a GET request
pub type QueryParams = [(String, String)];

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Read-only request. `path` is absolute, e.g. `/cosmos/bank/v1beta1/params`.
    async fn get(&self, path: &str, query: &QueryParams) -> Result<Value>;

    /// State changing request with a JSON body. Never retried.
    async fn post(&self, path: &str, body: &Value) -> Result<Value>;
}

/// Error body returned by the gateway: `{"code": 5, "message": "..."}`
#[derive(Deserialize)]
struct NodeError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// `reqwest` based dispatcher for one LCD endpoint
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    base_url: Url,
    http: reqwest::Client,
    read_retries: u32,
}

impl HttpDispatcher {
    pub fn new(endpoint: &str, transport: &TransportConfig) -> Result<Self> {
        let mut base_url = Url::parse(endpoint)
            .map_err(|e| Error::Configuration(format!("invalid LCD url {endpoint:?}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(transport.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http,
            read_retries: transport.read_retries,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Configuration(format!("invalid request path {path:?}: {e}")))
    }

    async fn read_response(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("failed to read response body: {e}")))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()));
        }

        let message = match serde_json::from_str::<NodeError>(&body) {
            Ok(NodeError {
                message: Some(message),
                code,
            }) => match code {
                Some(code) => format!("code {code}: {message}"),
                None => message,
            },
            _ if body.is_empty() => status.to_string(),
            _ => body,
        };
        Err(Error::Transport {
            status: Some(status.as_u16()),
            message,
        })
    }
}

fn is_retryable(err: &Error) -> bool {
    match err {
        Error::Transport { status: None, .. } => true,
        Error::Transport {
            status: Some(status),
            ..
        } => *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn get(&self, path: &str, query: &QueryParams) -> Result<Value> {
        let url = self.url(path)?;
        let mut attempt = 0;
        loop {
            debug!(url = %url, attempt, "GET");
            let result = match self.http.get(url.clone()).query(query).send().await {
                Ok(response) => Self::read_response(response).await,
                Err(e) => Err(Error::transport(e.to_string())),
            };
            match result {
                Err(err) if attempt < self.read_retries && is_retryable(&err) => {
                    attempt += 1;
                    warn!(url = %url, attempt, error = %err, "retrying read request");
                    tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
                }
                other => return other,
            }
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path)?;
        debug!(url = %url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Self::read_response(response).await
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Scripted HTTP/1.1 server for transport tests

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn read_request(stream: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= pos + 4 + length {
                    return;
                }
            }
        }
    }

    /// Serves `responses` in order, one per connection, then repeats the last
    pub async fn spawn(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)].clone();
                read_request(&mut stream).await;
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(reply.as_bytes()).await;
            }
        });
        (format!("http://{addr}"), hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn transport(read_retries: u32) -> TransportConfig {
        TransportConfig {
            timeout_secs: 5,
            read_retries,
            ..Default::default()
        }
    }

    #[test]
    fn test_url_joining_keeps_prefix() {
        let dispatcher =
            HttpDispatcher::new("http://node.local/lcd", &TransportConfig::default()).unwrap();
        assert_eq!(
            dispatcher.url("/cosmos/tx/v1beta1/txs").unwrap().as_str(),
            "http://node.local/lcd/cosmos/tx/v1beta1/txs"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            HttpDispatcher::new("not a url", &TransportConfig::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_get_success() {
        let (url, _) = test_server::spawn(vec![(200, r#"{"params":{"x":"1"}}"#.into())]).await;
        let dispatcher = HttpDispatcher::new(&url, &transport(0)).unwrap();
        let value = dispatcher.get("/cosmos/auth/v1beta1/params", &[]).await.unwrap();
        assert_eq!(value["params"]["x"], "1");
    }

    #[tokio::test]
    async fn test_node_error_normalized() {
        let (url, _) = test_server::spawn(vec![(
            404,
            r#"{"code":5,"message":"account not found","details":[]}"#.into(),
        )])
        .await;
        let dispatcher = HttpDispatcher::new(&url, &transport(2)).unwrap();
        match dispatcher.get("/cosmos/auth/v1beta1/accounts/x", &[]).await {
            Err(Error::Transport { status, message }) => {
                assert_eq!(status, Some(404));
                assert_eq!(message, "code 5: account not found");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_retries_server_errors() {
        let (url, hits) = test_server::spawn(vec![
            (503, String::new()),
            (200, r#"{"ok":true}"#.into()),
        ])
        .await;
        let dispatcher = HttpDispatcher::new(&url, &transport(2)).unwrap();
        let value = dispatcher.get("/status", &[]).await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_post_never_retries() {
        let (url, hits) = test_server::spawn(vec![
            (503, String::new()),
            (200, r#"{"ok":true}"#.into()),
        ])
        .await;
        let dispatcher = HttpDispatcher::new(&url, &transport(2)).unwrap();
        let err = dispatcher
            .post("/cosmos/tx/v1beta1/txs", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(503), .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
