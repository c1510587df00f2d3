//! Blocklist Source Fetching
//!
//! One-shot HTTP(S) GET with a hard deadline. Blocklist sources are
//! fetched rarely (daily, typically), so there is no connection pool:
//! connect, send, collect, done. HTTPS goes through rustls with the
//! webpki root set.

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::header::{HOST, USER_AGENT};
use hyper::{Method, Request, Uri};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

const FETCH_USER_AGENT: &str = "veil-filter/0.1";

/// Fetch failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Response is not UTF-8 text")]
    NotText,

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// GET `url` and return the response body as text, failing fast once
/// `timeout` elapses.
pub async fn get_text(url: &str, timeout: Duration) -> Result<String, FetchError> {
    match tokio::time::timeout(timeout, get_text_inner(url)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Fetch of {} timed out after {:?}", url, timeout);
            Err(FetchError::Timeout(timeout))
        }
    }
}

async fn get_text_inner(url: &str) -> Result<String, FetchError> {
    let uri: Uri = url
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| FetchError::InvalidUrl(e.to_string()))?;

    let host = uri
        .host()
        .ok_or_else(|| FetchError::InvalidUrl("No host in URL".to_string()))?
        .to_string();
    let is_https = uri.scheme_str() == Some("https");
    let port = uri.port_u16().unwrap_or(if is_https { 443 } else { 80 });

    let request = Request::builder()
        .method(Method::GET)
        .uri(&uri)
        .header(USER_AGENT, FETCH_USER_AGENT)
        .header(HOST, &host)
        .body(Empty::<Bytes>::new())
        .map_err(|e| FetchError::Http(e.to_string()))?;

    let stream = TcpStream::connect((host.as_str(), port))
        .await
        .map_err(|e| FetchError::ConnectionFailed(e.to_string()))?;

    let response = if is_https {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let connector = TlsConnector::from(Arc::new(tls_config));
        let server_name = rustls::pki_types::ServerName::try_from(host.clone())
            .map_err(|_| FetchError::Tls("Invalid server name".to_string()))?;
        let tls_stream = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| FetchError::Tls(e.to_string()))?;

        let io = hyper_util::rt::TokioIo::new(tls_stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!("Connection error: {}", e);
            }
        });
        sender
            .send_request(request)
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?
    } else {
        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!("Connection error: {}", e);
            }
        });
        sender
            .send_request(request)
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?
    };

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let collected = response
        .into_body()
        .collect()
        .await
        .map_err(|e| FetchError::Http(e.to_string()))?;
    let bytes = collected.to_bytes();

    debug!("Fetched {} ({} bytes)", url, bytes.len());
    String::from_utf8(bytes.to_vec()).map_err(|_| FetchError::NotText)
}
