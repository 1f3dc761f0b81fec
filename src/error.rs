//! Error types shared across the balancer
//!
//! Only [`BalancerError`] ever reaches a caller of the balancer. Probe and
//! connect errors are absorbed by the selector and turned into health
//! transitions; they exist as values so the selector can match on them and
//! log the cause.

use std::time::Duration;
use thiserror::Error;

use crate::s3::S3Error;

/// Errors surfaced when constructing a [`Balancer`](crate::lb::Balancer)
#[derive(Error, Debug)]
pub enum BalancerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no healthy endpoints: all {0} configured endpoints failed their initial health check")]
    NoHealthyEndpoints(usize),
}

/// Why a single health probe failed
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("storage error: {0}")]
    Storage(#[from] S3Error),
}

/// Why a connection handle could not be built for an endpoint
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("invalid endpoint address '{0}'")]
    InvalidAddress(String),

    #[error("client construction failed: {0}")]
    Client(#[source] S3Error),

    #[error("connect refused: {0}")]
    Refused(String),
}
