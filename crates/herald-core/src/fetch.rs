use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::error::FetchError;
use crate::surface::ProxySource;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

const USER_AGENT: &str = concat!("herald/", env!("CARGO_PKG_VERSION"));

/// Signed manifest exactly as received, minus line breaks. Unverified, so its
/// `Debug` output never includes the body.
#[derive(Clone, PartialEq, Eq)]
pub struct RawManifestToken(String);

impl RawManifestToken {
    #[must_use]
    pub fn new(body: &str) -> Self {
        Self(strip_line_breaks(body))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 of the token, for correlating log lines without logging it.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{:x}", Sha256::digest(self.0.as_bytes()))
    }
}

impl fmt::Debug for RawManifestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawManifestToken")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

fn strip_line_breaks(body: &str) -> String {
    body.replace(['\r', '\n'], "")
}

#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch(&self, endpoint: &str) -> Result<RawManifestToken, FetchError>;
}

/// Fetches the manifest over HTTP(S). When the host has a proxy configured,
/// every request goes through it whatever the endpoint's scheme.
pub struct HttpManifestFetcher {
    proxy: Box<dyn ProxySource>,
    timeout: Duration,
}

impl HttpManifestFetcher {
    pub fn new(proxy: impl ProxySource + 'static) -> Self {
        Self {
            proxy: Box::new(proxy),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_client(&self, endpoint: &str) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout);

        builder = match self.proxy.https_proxy() {
            Some(proxy) => {
                debug!("Routing manifest request through proxy {proxy}");
                let configured = reqwest::Proxy::all(proxy.as_str())
                    .map_err(|source| FetchError::Proxy { proxy, source })?;
                builder.proxy(configured)
            }
            None => builder.no_proxy(),
        };

        builder.build().map_err(|source| FetchError::Client {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn fetch_inner(&self, endpoint: &str) -> Result<RawManifestToken, FetchError> {
        let client = self.build_client(endpoint)?;

        let response = client
            .get(endpoint)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                endpoint: endpoint.to_string(),
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let token = RawManifestToken::new(&body);
        if token.is_empty() {
            return Err(FetchError::EmptyBody {
                endpoint: endpoint.to_string(),
            });
        }

        Ok(token)
    }
}

#[async_trait]
impl ManifestSource for HttpManifestFetcher {
    async fn fetch(&self, endpoint: &str) -> Result<RawManifestToken, FetchError> {
        match self.fetch_inner(endpoint).await {
            Ok(token) => {
                debug!(
                    "Fetched manifest from {endpoint} ({} bytes, sha256 {})",
                    token.as_str().len(),
                    token.fingerprint()
                );
                Ok(token)
            }
            Err(error) => {
                if error.is_timeout() {
                    warn!("Cannot GET {endpoint}: timed out after {:?}", self.timeout);
                } else {
                    warn!("Cannot GET {endpoint}: {error}");
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::{HttpManifestFetcher, ManifestSource, RawManifestToken};
    use crate::error::FetchError;
    use crate::surface::NoProxy;

    fn read_request_head(stream: &mut TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0_u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        String::from_utf8_lossy(&request).into_owned()
    }

    /// Serve exactly one HTTP response on a loopback port. Returns the bound
    /// address and a receiver for the request head that was served.
    fn serve_once_on(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");
        let (requests, received) = mpsc::channel();
        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let head = read_request_head(&mut stream);
            let response = format!(
                "{status_line}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = requests.send(head);
        });
        (addr.to_string(), received)
    }

    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let (addr, _) = serve_once_on(status_line, body);
        format!("http://{addr}/update.jws")
    }

    #[test]
    fn token_strips_carriage_returns_and_line_feeds() {
        let token = RawManifestToken::new("abc.\r\ndef\n.ghi\r\n");
        assert_eq!(token.as_str(), "abc.def.ghi");
    }

    #[test]
    fn token_debug_output_hides_body() {
        let token = RawManifestToken::new("secret-looking-body");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("len"));
    }

    #[tokio::test]
    async fn fetch_returns_body_without_line_breaks() {
        let endpoint = serve_once("HTTP/1.1 200 OK", "aaa.\r\nbbb.\nccc\n");
        let fetcher = HttpManifestFetcher::new(NoProxy);

        let token = fetcher.fetch(&endpoint).await.expect("fetch should succeed");

        assert_eq!(token.as_str(), "aaa.bbb.ccc");
    }

    #[tokio::test]
    async fn fetch_rejects_non_success_status() {
        let endpoint = serve_once("HTTP/1.1 503 Service Unavailable", "down");
        let fetcher = HttpManifestFetcher::new(NoProxy);

        let error = fetcher.fetch(&endpoint).await.expect_err("503 should fail");

        assert!(matches!(
            error,
            FetchError::HttpStatus { status, .. } if status.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn fetch_rejects_body_that_is_only_line_breaks() {
        let endpoint = serve_once("HTTP/1.1 200 OK", "\r\n\n");
        let fetcher = HttpManifestFetcher::new(NoProxy);

        let error = fetcher.fetch(&endpoint).await.expect_err("empty body should fail");

        assert!(matches!(error, FetchError::EmptyBody { .. }));
    }

    #[tokio::test]
    async fn fetch_reports_connection_failures_as_request_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");
        drop(listener);
        let fetcher = HttpManifestFetcher::new(NoProxy).with_timeout(Duration::from_secs(2));

        let error = fetcher
            .fetch(&format!("http://{addr}/update.jws"))
            .await
            .expect_err("closed port should fail");

        assert!(matches!(error, FetchError::Request { .. }));
    }

    #[tokio::test]
    async fn configured_proxy_carries_plain_http_requests() {
        let (proxy_addr, requests) = serve_once_on("HTTP/1.1 200 OK", "via.proxy.token");
        let fetcher = HttpManifestFetcher::new(Some(format!("http://{proxy_addr}")));

        let token = fetcher
            .fetch("http://manifest.invalid/update.jws")
            .await
            .expect("proxy should answer for the unresolvable host");

        assert_eq!(token.as_str(), "via.proxy.token");
        let head = requests
            .recv_timeout(Duration::from_secs(5))
            .expect("proxy should have seen the request");
        assert!(
            head.starts_with("GET http://manifest.invalid/update.jws"),
            "{head}"
        );
    }

    #[tokio::test]
    async fn unsupported_proxy_scheme_fails_as_network_error() {
        let fetcher = HttpManifestFetcher::new(Some("socks5://127.0.0.1:1080".to_string()))
            .with_timeout(Duration::from_secs(2));

        let error = fetcher
            .fetch("http://manifest.invalid/update.jws")
            .await
            .expect_err("socks proxy is not supported");

        assert!(matches!(
            error,
            FetchError::Proxy { .. } | FetchError::Client { .. } | FetchError::Request { .. }
        ));
    }

    #[tokio::test]
    async fn silent_server_times_out_as_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");
        let (release, hold) = mpsc::channel::<()>();
        thread::spawn(move || {
            let Ok((_stream, _)) = listener.accept() else {
                return;
            };
            let _ = hold.recv_timeout(Duration::from_secs(10));
        });
        let fetcher = HttpManifestFetcher::new(NoProxy).with_timeout(Duration::from_millis(200));

        let error = fetcher
            .fetch(&format!("http://{addr}/update.jws"))
            .await
            .expect_err("silent server should time out");
        drop(release);

        assert!(matches!(error, FetchError::Request { .. }));
        assert!(error.is_timeout());
    }
}
