//! S3 client bound to a single endpoint
//!
//! Deliberately small: the balancer only needs a handle it can construct per
//! endpoint and one cheap read-only call (ListBuckets) to probe it with.
//!
//! - HTTP/1.1 over hyper's pooled legacy client
//! - native-tls for https endpoints
//! - TCP_NODELAY and a bounded connect timeout

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Method, Request, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::error::ProbeError;
use crate::lb::Connection;
use crate::s3::signer::S3SignerV4;
use crate::s3::types::{Bucket, Credentials};

/// S3 client errors
#[derive(Error, Debug)]
pub enum S3Error {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("S3 error: {status} - {message}")]
    S3Response { status: StatusCode, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<quick_xml::Error> for S3Error {
    fn from(err: quick_xml::Error) -> Self {
        S3Error::XmlParse(err.to_string())
    }
}

impl From<hyper_util::client::legacy::Error> for S3Error {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        S3Error::InvalidResponse(format!("Client error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, S3Error>;

/// TCP + TLS connector shared by the S3 client and the liveness probe
pub(crate) fn https_connector(connect_timeout: Duration) -> Result<HttpsConnector<HttpConnector>> {
    let mut http = HttpConnector::new();
    http.set_nodelay(true);
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));
    http.set_keepalive(Some(Duration::from_secs(90)));

    let tls = TlsConnector::new()?;
    Ok(HttpsConnector::from((http, tls.into())))
}

/// Validate `host[:port]` and turn it into a base URL
pub(crate) fn endpoint_url(address: &str, secure: bool) -> Result<String> {
    let scheme = if secure { "https" } else { "http" };
    let address = address.trim().trim_end_matches('/');
    if address.is_empty() || address.contains("://") {
        return Err(S3Error::InvalidEndpoint(format!(
            "'{}': expected host[:port] without scheme",
            address
        )));
    }

    let base = format!("{}://{}", scheme, address);
    let url = Url::parse(&base).map_err(|e| S3Error::InvalidEndpoint(format!("'{}': {}", address, e)))?;
    if url.host_str().is_none() || url.path() != "/" || url.query().is_some() {
        return Err(S3Error::InvalidEndpoint(format!(
            "'{}': expected host[:port] without path or query",
            address
        )));
    }
    Ok(base)
}

/// Handle to one S3 endpoint
///
/// Clone is cheap: clones share the hyper connection pool and the signer.
#[derive(Clone)]
pub struct S3Client {
    client: HyperClient<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    signer: Arc<S3SignerV4>,
    /// `scheme://host[:port]`
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl S3Client {
    /// Build a client for `address` (`host[:port]`).
    ///
    /// Fails on a malformed address or if the TLS connector cannot be built.
    /// No network traffic happens here.
    pub fn new(address: &str, credentials: &Credentials, secure: bool, region: Option<String>) -> Result<Self> {
        let base_url = endpoint_url(address, secure)?;
        let timeout = Duration::from_secs(30);
        let https = https_connector(timeout)?;

        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .set_host(true)
            .build(https);

        let signer = S3SignerV4::new(
            credentials.access_key.clone(),
            credentials.secret_key.clone(),
            region,
        );

        Ok(Self {
            client,
            signer: Arc::new(signer),
            base_url,
            timeout,
        })
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one signed request with an empty body, bounded by the client timeout
    async fn request_once(&self, method: Method, url: &str) -> Result<(StatusCode, Bytes)> {
        let headers: BTreeMap<String, String> = self.signer.sign(method.as_str(), url, BTreeMap::new())?;

        let mut req = Request::builder().method(method).uri(url);
        for (key, value) in headers.iter() {
            req = req.header(key, value);
        }
        let request = req
            .body(Empty::new())
            .map_err(|e| S3Error::InvalidResponse(format!("Request build error: {}", e)))?;

        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let body = response
                .collect()
                .await
                .map_err(|e| S3Error::InvalidResponse(format!("Body error: {}", e)))?
                .to_bytes();
            Ok::<_, S3Error>((status, body))
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(S3Error::Timeout(self.timeout)),
        }
    }

    /// List all buckets visible to the credentials (S3 ListBuckets)
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let url = format!("{}/", self.base_url);
        let (status, body) = self.request_once(Method::GET, &url).await?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&body).to_string();
            return Err(S3Error::S3Response { status, message });
        }

        parse_list_buckets(&body)
    }
}

/// Parse a `ListAllMyBucketsResult` document
pub(crate) fn parse_list_buckets(xml_data: &[u8]) -> Result<Vec<Bucket>> {
    let mut reader = Reader::from_reader(xml_data);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut buckets = Vec::new();
    let mut current: Option<Bucket> = None;
    let mut text = String::new();
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ListAllMyBucketsResult" => saw_root = true,
                b"Bucket" => current = Some(Bucket::new(String::new())),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                text.clear();
                text.push_str(&e.unescape().map_err(|e| S3Error::XmlParse(e.to_string()))?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Name" => {
                        if let Some(ref mut bucket) = current {
                            bucket.name = std::mem::take(&mut text);
                        }
                    }
                    b"CreationDate" => {
                        if let Some(ref mut bucket) = current {
                            bucket.creation_date = Some(std::mem::take(&mut text));
                        }
                    }
                    b"Bucket" => {
                        if let Some(bucket) = current.take() {
                            buckets.push(bucket);
                        }
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    if !saw_root {
        return Err(S3Error::InvalidResponse(
            "missing ListAllMyBucketsResult element".to_string(),
        ));
    }

    Ok(buckets)
}

#[async_trait]
impl Connection for S3Client {
    async fn ping(&self) -> std::result::Result<(), ProbeError> {
        self.list_buckets().await?;
        Ok(())
    }
}
