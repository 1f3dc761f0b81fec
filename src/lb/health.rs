use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Method, Request, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracing::debug;

use super::connector::Connection;
use crate::error::ProbeError;
use crate::s3::client::https_connector;
use crate::s3::S3Error;

/// MinIO liveness endpoint
pub const LIVENESS_PATH: &str = "/minio/health/live";

/// Transport-level liveness check that needs no storage client
#[async_trait]
pub trait LivenessProbe: Send + Sync + 'static {
    async fn probe(&self, address: &str) -> Result<(), ProbeError>;
}

/// Plain HTTP GET against `/minio/health/live`
///
/// Holds one pooled hyper client for all endpoints; its idle connections are
/// released when the probe is dropped.
pub struct HttpLivenessProbe {
    client: HyperClient<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    scheme: &'static str,
    timeout: Duration,
}

impl HttpLivenessProbe {
    pub fn new(secure: bool, timeout: Duration) -> Result<Self, S3Error> {
        let https = https_connector(timeout)?;
        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build(https);

        Ok(Self {
            client,
            scheme: if secure { "https" } else { "http" },
            timeout,
        })
    }

    pub fn url_for(&self, address: &str) -> String {
        format!("{}://{}{}", self.scheme, address.trim_end_matches('/'), LIVENESS_PATH)
    }

    async fn get_status(&self, url: &str) -> Result<StatusCode, ProbeError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProbeError::Transport(format!("request build error: {}", e)))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ProbeError::Transport(e.to_string()))?;
        let status = response.status();

        // Drain so the connection goes back to the pool
        let _ = response.into_body().collect().await;
        Ok(status)
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn probe(&self, address: &str) -> Result<(), ProbeError> {
        let url = self.url_for(address);
        let status = match tokio::time::timeout(self.timeout, self.get_status(&url)).await {
            Ok(result) => result?,
            Err(_) => return Err(ProbeError::Timeout(self.timeout)),
        };

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }
}

/// Decides whether one endpoint is usable right now
///
/// Goes through the existing connection when there is one, otherwise falls
/// back to the transport-level liveness check. The caller decides what a
/// failure means for the endpoint.
pub struct HealthProbe<L> {
    liveness: L,
    timeout: Duration,
}

impl<L: LivenessProbe> HealthProbe<L> {
    pub fn new(liveness: L, timeout: Duration) -> Self {
        Self { liveness, timeout }
    }

    /// Probe one endpoint, bounded by the probe timeout on either path.
    ///
    /// Uses `existing` when there is one, otherwise the liveness check.
    pub async fn check<C: Connection>(&self, address: &str, existing: Option<&C>) -> Result<(), ProbeError> {
        let outcome = match existing {
            Some(conn) => tokio::time::timeout(self.timeout, conn.ping()).await,
            None => tokio::time::timeout(self.timeout, self.liveness.probe(address)).await,
        };
        let result = outcome.unwrap_or(Err(ProbeError::Timeout(self.timeout)));

        match &result {
            Ok(()) => debug!(endpoint = %address, via_connection = existing.is_some(), "health check ok"),
            Err(e) => debug!(endpoint = %address, via_connection = existing.is_some(), error = %e, "health check failed"),
        }
        result
    }
}
