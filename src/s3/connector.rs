use std::time::Duration;
use tracing::debug;

use super::client::{S3Client, S3Error};
use super::types::Credentials;
use crate::error::ConnectError;
use crate::lb::Connector;

/// Builds an [`S3Client`] per endpoint address from shared credentials
#[derive(Debug, Clone)]
pub struct S3Connector {
    credentials: Credentials,
    secure: bool,
    region: Option<String>,
    timeout: Duration,
}

impl S3Connector {
    pub fn new(credentials: Credentials, secure: bool, region: Option<String>) -> Self {
        Self {
            credentials,
            secure,
            region,
            timeout: Duration::from_secs(5),
        }
    }

    /// Timeout applied to every request made through the built clients
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Connector for S3Connector {
    type Connection = S3Client;

    fn connect(&self, address: &str) -> Result<S3Client, ConnectError> {
        let client = S3Client::new(address, &self.credentials, self.secure, self.region.clone())
            .map_err(|e| match e {
                S3Error::InvalidEndpoint(_) => ConnectError::InvalidAddress(address.to_string()),
                other => ConnectError::Client(other),
            })?
            .with_timeout(self.timeout);

        debug!(endpoint = %address, base_url = %client.base_url(), "built s3 client");
        Ok(client)
    }
}
