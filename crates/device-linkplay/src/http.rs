use async_trait::async_trait;
use linkplayctl_core::{Command, Error, Response, Result, Throttle, Transport};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tunables for the HTTP transport
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Minimum time between two commands to the same device
    pub command_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            command_interval_ms: 2000,
            request_timeout_ms: 30_000,
        }
    }
}

/// LinkPlay HTTP API transport
///
/// API format: http://{host}/httpapi.asp?command={command}
pub struct HttpTransport {
    address: String,
    client: Client,
    throttle: Throttle,
    settings: TransportSettings,
}

impl HttpTransport {
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Self::with_settings(address, TransportSettings::default())
    }

    pub fn with_settings(address: impl Into<String>, settings: TransportSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(|e| Error::connection(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            address: address.into(),
            client,
            throttle: Throttle::new(Duration::from_millis(settings.command_interval_ms)),
            settings,
        })
    }

    fn url(&self, command: &Command) -> String {
        format!("http://{}/httpapi.asp?command={}", self.address, command)
    }

    async fn fetch(&self, url: &str) -> Result<Response> {
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::connection(format!("Could not connect to '{}': {}", self.address, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::connection(format!("Connection to '{}' interrupted: {}", self.address, e)))?;

        tracing::debug!(
            "Response received in {:.1}ms [Status: {} Length: {} bytes]{}",
            started.elapsed().as_secs_f64() * 1000.0,
            status,
            body.len(),
            if body.len() < 16 { format!(": {}", body) } else { String::new() }
        );

        Ok(Response { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send(&mut self, command: &Command) -> Result<Response> {
        let url = self.url(command);
        self.throttle.wait().await;

        tracing::debug!("Requesting '{}'...", url);
        let result = self.fetch(&url).await;
        self.throttle.mark();
        result
    }

    fn open(&self, address: &str) -> Result<Self> {
        Self::with_settings(address, self.settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast_settings() -> TransportSettings {
        TransportSettings {
            command_interval_ms: 0,
            request_timeout_ms: 2000,
        }
    }

    /// Serve a single canned HTTP response and hand back the request line
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request.lines().next().unwrap_or_default().to_string()
        });

        (address, handle)
    }

    #[tokio::test]
    async fn test_sends_command_in_query() {
        let (address, server) = serve_once("200 OK", "OK").await;
        let mut transport = HttpTransport::with_settings(address, fast_settings()).unwrap();

        let response = transport
            .send(&Command::new("setPlayerCmd").arg("vol").arg(42))
            .await
            .unwrap();
        assert_eq!(response, Response::new(200, "OK"));

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /httpapi.asp?command=setPlayerCmd:vol:42 "));
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let (address, server) = serve_once("500 Internal Server Error", "Failed").await;
        let mut transport = HttpTransport::with_settings(address, fast_settings()).unwrap();

        let response = transport.send(&Command::new("reboot")).await.unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, "Failed");
        assert!(!response.is_success());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        // Grab a free port, then close it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut transport = HttpTransport::with_settings(address, fast_settings()).unwrap();
        let err = transport.send(&Command::new("getStatus")).await.unwrap_err();
        assert!(err.is_connection(), "unexpected error: {:?}", err);
    }

    #[test]
    fn test_default_settings() {
        let settings = TransportSettings::default();
        assert_eq!(settings.command_interval_ms, 2000);
        assert_eq!(settings.request_timeout_ms, 30_000);
    }
}
