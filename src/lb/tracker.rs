use chrono::{DateTime, Duration, Utc};

use super::endpoint::{EndpointHealth, EndpointState, Link};

/// Failure bookkeeping and backoff decisions for endpoints
#[derive(Debug, Clone, Copy)]
pub struct FailureTracker {
    backoff: Duration,
}

impl FailureTracker {
    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }

    /// Store a verified connection and clear any failure timestamp
    pub fn mark_healthy<C>(&self, endpoint: &mut EndpointState<C>, connection: C) {
        endpoint.link = Link::Connected(connection);
    }

    /// Drop the connection and start the failure clock.
    ///
    /// An endpoint that is already down keeps its original failure time, so
    /// repeated probing does not push its recovery check further out.
    /// Returns the discarded connection, if there was one.
    pub fn mark_unhealthy<C>(&self, endpoint: &mut EndpointState<C>, now: DateTime<Utc>) -> Option<C> {
        match std::mem::replace(&mut endpoint.link, Link::Down { since: now }) {
            Link::Connected(conn) => Some(conn),
            Link::Down { since } => {
                endpoint.link = Link::Down { since };
                None
            }
        }
    }

    /// Restart the backoff window at `now` after a failed recovery attempt
    pub fn restart_backoff<C>(&self, endpoint: &mut EndpointState<C>, now: DateTime<Utc>) {
        endpoint.link = Link::Down { since: now };
    }

    /// True iff the endpoint has failed and at least `backoff` has elapsed since
    pub fn is_past_backoff<C>(&self, endpoint: &EndpointState<C>, now: DateTime<Utc>) -> bool {
        match endpoint.last_failure() {
            Some(since) => now - since >= self.backoff,
            None => false,
        }
    }

    pub fn classify<C>(&self, endpoint: &EndpointState<C>, now: DateTime<Utc>) -> EndpointHealth {
        match endpoint.last_failure() {
            None => EndpointHealth::Healthy,
            Some(since) if now - since >= self.backoff => EndpointHealth::Retryable { since },
            Some(since) => EndpointHealth::Backoff { since },
        }
    }
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(Duration::minutes(10))
    }
}
