//! Seams between the balancer and the storage client it hands out

use async_trait::async_trait;

use crate::error::{ConnectError, ProbeError};

/// A live handle to one storage endpoint
///
/// Clones must be cheap and share underlying transport state; the balancer
/// keeps its own copy and hands clones to callers.
#[async_trait]
pub trait Connection: Clone + Send + Sync + 'static {
    /// One lightweight, read-only protocol call used as a liveness probe
    async fn ping(&self) -> Result<(), ProbeError>;
}

/// Builds connection handles for endpoint addresses
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    fn connect(&self, address: &str) -> Result<Self::Connection, ConnectError>;
}
