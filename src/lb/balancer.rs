use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use super::connector::Connector;
use super::endpoint::EndpointStatus;
use super::health::{HealthProbe, HttpLivenessProbe, LivenessProbe};
use super::selector::{BalancerState, Selection, Selector};
use super::tracker::FailureTracker;
use crate::clock::{Clock, SystemClock};
use crate::config::BalancerConfig;
use crate::error::BalancerError;
use crate::s3::{Credentials, S3Connector};

/// Timing knobs for probing and recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSettings {
    /// Upper bound for a single health probe
    pub probe_timeout: Duration,
    /// Minimum time an endpoint stays out of rotation after failing
    pub recovery_backoff: Duration,
}

impl Default for BalanceSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            recovery_backoff: Duration::from_secs(10 * 60),
        }
    }
}

/// Client-side load balancer over a fixed set of storage endpoints
///
/// All selection state sits behind one async mutex that is held for the
/// whole of a [`select`](Balancer::select) call, probes included. Share it
/// between tasks with `Arc`.
pub struct Balancer<C: Connector = S3Connector, L = HttpLivenessProbe> {
    state: Mutex<BalancerState<C::Connection>>,
    selector: Selector<C, L>,
    addresses: Vec<String>,
}

impl Balancer {
    /// Build a balancer over S3 endpoints from configuration
    pub async fn from_config(config: &BalancerConfig) -> Result<Self, BalancerError> {
        config.validate()?;

        let probe_timeout = config.probe_timeout();
        let credentials = Credentials::new(config.access_key.clone(), config.secret_key.clone());
        let connector = S3Connector::new(credentials, config.secure, Some(config.region.clone()))
            .with_timeout(probe_timeout);
        let liveness = HttpLivenessProbe::new(config.secure, probe_timeout)
            .map_err(|e| BalancerError::Configuration(format!("failed to build liveness client: {}", e)))?;

        let settings = BalanceSettings {
            probe_timeout,
            recovery_backoff: config.recovery_backoff(),
        };

        Self::new(
            config.endpoints.clone(),
            connector,
            liveness,
            Arc::new(SystemClock),
            settings,
        )
        .await
    }
}

impl<C: Connector, L: LivenessProbe> Balancer<C, L> {
    /// Connect to and probe every endpoint, then start balancing.
    ///
    /// Fails if `addresses` is empty or if no endpoint passes its initial
    /// health check.
    pub async fn new(
        addresses: Vec<String>,
        connector: C,
        liveness: L,
        clock: Arc<dyn Clock>,
        settings: BalanceSettings,
    ) -> Result<Self, BalancerError> {
        if addresses.is_empty() {
            return Err(BalancerError::Configuration("endpoint list cannot be empty".to_string()));
        }
        if settings.probe_timeout.is_zero() {
            return Err(BalancerError::Configuration("probe timeout must be greater than zero".to_string()));
        }
        let backoff = chrono::Duration::from_std(settings.recovery_backoff).map_err(|_| {
            BalancerError::Configuration(format!(
                "recovery backoff {:?} is out of range",
                settings.recovery_backoff
            ))
        })?;

        let selector = Selector::new(
            connector,
            HealthProbe::new(liveness, settings.probe_timeout),
            FailureTracker::new(backoff),
            clock,
        );

        let mut endpoints = Vec::with_capacity(addresses.len());
        for address in &addresses {
            endpoints.push(selector.initialize(address.clone()).await);
        }

        let healthy = endpoints.iter().filter(|ep| ep.is_connected()).count();
        if healthy == 0 {
            return Err(BalancerError::NoHealthyEndpoints(addresses.len()));
        }

        info!(
            healthy,
            total = addresses.len(),
            probe_timeout_ms = settings.probe_timeout.as_millis() as u64,
            recovery_backoff_secs = settings.recovery_backoff.as_secs(),
            "balancer initialized"
        );

        Ok(Self {
            state: Mutex::new(BalancerState::new(endpoints)),
            selector,
            addresses,
        })
    }

    /// Next healthy endpoint in round-robin order, or `None` if none is usable.
    ///
    /// Examines each endpoint at most once, so a call awaits at most
    /// `endpoint_count() * probe_timeout` plus reconnect cost.
    pub async fn select(&self) -> Option<Selection<C::Connection>> {
        let mut state = self.state.lock().await;
        self.selector.select(&mut state).await
    }

    /// Current health of every endpoint, without probing
    pub async fn status(&self) -> Vec<EndpointStatus> {
        let state = self.state.lock().await;
        let now = self.selector.clock().now();
        let tracker = self.selector.tracker();

        state
            .endpoints()
            .iter()
            .enumerate()
            .map(|(index, ep)| EndpointStatus {
                index,
                address: ep.address().to_string(),
                health: tracker.classify(ep, now),
            })
            .collect()
    }

    /// Number of configured endpoints
    pub fn endpoint_count(&self) -> usize {
        self.addresses.len()
    }

    /// Address of the endpoint at `index`
    pub fn address(&self, index: usize) -> Option<&str> {
        self.addresses.get(index).map(String::as_str)
    }

    /// Release every connection and the liveness transport
    pub fn shutdown(self) {
        let endpoints = self.endpoint_count();
        drop(self.state);
        drop(self.selector);
        info!(endpoints, "balancer shut down");
    }
}
