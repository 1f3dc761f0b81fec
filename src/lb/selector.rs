use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::connector::Connector;
use super::endpoint::EndpointState;
use super::health::{HealthProbe, LivenessProbe};
use super::tracker::FailureTracker;
use crate::clock::Clock;

/// Endpoint handed back by a successful selection
#[derive(Debug, Clone)]
pub struct Selection<C> {
    /// Position of the endpoint in the configured list
    pub index: usize,
    pub address: String,
    pub connection: C,
}

/// Endpoints plus the round-robin cursor, guarded as one unit by the balancer
#[derive(Debug)]
pub(crate) struct BalancerState<C> {
    pub(crate) endpoints: Vec<EndpointState<C>>,
    cursor: usize,
}

impl<C> BalancerState<C> {
    /// `endpoints` must be non-empty
    pub(crate) fn new(endpoints: Vec<EndpointState<C>>) -> Self {
        debug_assert!(!endpoints.is_empty());
        Self {
            endpoints,
            cursor: 0,
        }
    }

    #[cfg(test)]
    fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn endpoints(&self) -> &[EndpointState<C>] {
        &self.endpoints
    }

    /// Take the current position and advance the cursor
    fn advance(&mut self) -> usize {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.endpoints.len();
        index
    }
}

/// Round-robin scheduler that skips unhealthy endpoints and re-probes them
/// once their backoff window has elapsed
pub(crate) struct Selector<C: Connector, L> {
    connector: C,
    probe: HealthProbe<L>,
    tracker: FailureTracker,
    clock: Arc<dyn Clock>,
}

impl<C: Connector, L: LivenessProbe> Selector<C, L> {
    pub(crate) fn new(connector: C, probe: HealthProbe<L>, tracker: FailureTracker, clock: Arc<dyn Clock>) -> Self {
        Self {
            connector,
            probe,
            tracker,
            clock,
        }
    }

    pub(crate) fn tracker(&self) -> &FailureTracker {
        &self.tracker
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Build the initial state of one endpoint: connect, then probe through
    /// the new connection
    pub(crate) async fn initialize(&self, address: String) -> EndpointState<C::Connection> {
        let conn = match self.connector.connect(&address) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(endpoint = %address, error = %e, "failed to initialize client for endpoint");
                return EndpointState::down(address, self.clock.now());
            }
        };

        match self.probe.check(&address, Some(&conn)).await {
            Ok(()) => {
                debug!(endpoint = %address, "endpoint healthy at startup");
                EndpointState::connected(address, conn)
            }
            Err(e) => {
                warn!(endpoint = %address, error = %e, "initial health check failed");
                EndpointState::down(address, self.clock.now())
            }
        }
    }

    /// Pick the next usable endpoint, examining each endpoint at most once.
    ///
    /// The cursor advances on every attempt, successful or not. Returns `None`
    /// when no endpoint is usable right now.
    pub(crate) async fn select(&self, state: &mut BalancerState<C::Connection>) -> Option<Selection<C::Connection>> {
        let attempts = state.endpoints.len();

        for _ in 0..attempts {
            let index = state.advance();
            let endpoint = &mut state.endpoints[index];

            if let Some(conn) = endpoint.connection() {
                let error = match self.probe.check(endpoint.address(), Some(conn)).await {
                    Ok(()) => {
                        return Some(Selection {
                            index,
                            address: endpoint.address().to_string(),
                            connection: conn.clone(),
                        })
                    }
                    Err(e) => e,
                };

                let now = self.clock.now();
                self.tracker.mark_unhealthy(endpoint, now);
                warn!(
                    endpoint = %endpoint.address(),
                    index,
                    error = %error,
                    "endpoint became unhealthy, dropping its client"
                );
                continue;
            }

            if !self.tracker.is_past_backoff(endpoint, self.clock.now()) {
                trace!(endpoint = %endpoint.address(), index, "skipping endpoint in backoff");
                continue;
            }

            info!(endpoint = %endpoint.address(), index, "retrying previously unhealthy endpoint");
            if let Err(e) = self.probe.check::<C::Connection>(endpoint.address(), None).await {
                self.tracker.restart_backoff(endpoint, self.clock.now());
                warn!(endpoint = %endpoint.address(), index, error = %e, "endpoint still unhealthy after retry");
                continue;
            }

            match self.connector.connect(endpoint.address()) {
                Ok(conn) => {
                    self.tracker.mark_healthy(endpoint, conn.clone());
                    info!(endpoint = %endpoint.address(), index, "endpoint is back online");
                    return Some(Selection {
                        index,
                        address: endpoint.address().to_string(),
                        connection: conn,
                    });
                }
                Err(e) => {
                    self.tracker.restart_backoff(endpoint, self.clock.now());
                    warn!(
                        endpoint = %endpoint.address(),
                        index,
                        error = %e,
                        "failed to re-initialize client after retry"
                    );
                }
            }
        }

        warn!(endpoints = attempts, "no healthy endpoints available after checking all");
        None
    }
}
