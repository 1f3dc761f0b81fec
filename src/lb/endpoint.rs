use chrono::{DateTime, Utc};

/// Whether an endpoint currently holds a live connection
#[derive(Debug)]
pub enum Link<C> {
    /// Last probe succeeded; the handle is owned by this slot
    Connected(C),
    /// Known unhealthy since the given time
    Down { since: DateTime<Utc> },
}

/// Derived health of an endpoint at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EndpointHealth {
    Healthy,
    /// Failed, still inside the recovery backoff window
    Backoff { since: DateTime<Utc> },
    /// Failed, backoff window elapsed; the next selection pass will re-probe it
    Retryable { since: DateTime<Utc> },
}

impl EndpointHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, EndpointHealth::Healthy)
    }

    pub fn name(&self) -> &str {
        match self {
            EndpointHealth::Healthy => "healthy",
            EndpointHealth::Backoff { .. } => "backoff",
            EndpointHealth::Retryable { .. } => "retryable",
        }
    }
}

/// Per-endpoint record: address plus its current link
#[derive(Debug)]
pub struct EndpointState<C> {
    address: String,
    pub(crate) link: Link<C>,
}

impl<C> EndpointState<C> {
    pub fn connected(address: String, connection: C) -> Self {
        Self {
            address,
            link: Link::Connected(connection),
        }
    }

    pub fn down(address: String, since: DateTime<Utc>) -> Self {
        Self {
            address,
            link: Link::Down { since },
        }
    }

    /// Endpoint address (`host[:port]`)
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn connection(&self) -> Option<&C> {
        match &self.link {
            Link::Connected(conn) => Some(conn),
            Link::Down { .. } => None,
        }
    }

    /// When the endpoint was first seen failing, if it is currently down
    pub fn last_failure(&self) -> Option<DateTime<Utc>> {
        match self.link {
            Link::Connected(_) => None,
            Link::Down { since } => Some(since),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected(_))
    }
}

/// Status row for one endpoint
#[derive(Debug, Clone, serde::Serialize)]
pub struct EndpointStatus {
    pub index: usize,
    pub address: String,
    pub health: EndpointHealth,
}
