//! In-process fakes for the balancer's connection and liveness seams

#![allow(dead_code)]

use async_trait::async_trait;
use s3balancer::clock::ManualClock;
use s3balancer::error::{BalancerError, ConnectError, ProbeError};
use s3balancer::lb::{BalanceSettings, Balancer, Connection, Connector, LivenessProbe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One simulated storage node
#[derive(Debug, Default)]
pub struct FakeNode {
    pub down: AtomicBool,
    pub refuse_connect: AtomicBool,
    /// Liveness checks never answer
    pub hang_liveness: AtomicBool,
    pub pings: AtomicUsize,
    pub liveness_checks: AtomicUsize,
    pub connects: AtomicUsize,
}

impl FakeNode {
    pub fn set_up(&self, up: bool) {
        self.down.store(!up, Ordering::SeqCst);
    }

    pub fn is_up(&self) -> bool {
        !self.down.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn liveness_checks(&self) -> usize {
        self.liveness_checks.load(Ordering::SeqCst)
    }
}

/// Nodes addressed as `node-0`, `node-1`, ...
pub struct Cluster {
    pub nodes: Vec<Arc<FakeNode>>,
}

impl Cluster {
    pub fn new(n: usize) -> Arc<Self> {
        Arc::new(Self {
            nodes: (0..n).map(|_| Arc::new(FakeNode::default())).collect(),
        })
    }

    pub fn addresses(&self) -> Vec<String> {
        (0..self.nodes.len()).map(|i| format!("node-{}", i)).collect()
    }

    pub fn node(&self, address: &str) -> Option<&Arc<FakeNode>> {
        address
            .strip_prefix("node-")
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| self.nodes.get(i))
    }
}

#[derive(Clone, Debug)]
pub struct FakeConnection {
    pub node: Arc<FakeNode>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn ping(&self) -> Result<(), ProbeError> {
        self.node.pings.fetch_add(1, Ordering::SeqCst);
        if self.node.is_up() {
            Ok(())
        } else {
            Err(ProbeError::Transport("connection refused".to_string()))
        }
    }
}

pub struct FakeConnector {
    pub cluster: Arc<Cluster>,
}

impl Connector for FakeConnector {
    type Connection = FakeConnection;

    fn connect(&self, address: &str) -> Result<FakeConnection, ConnectError> {
        let node = self
            .cluster
            .node(address)
            .ok_or_else(|| ConnectError::InvalidAddress(address.to_string()))?;
        node.connects.fetch_add(1, Ordering::SeqCst);

        if node.refuse_connect.load(Ordering::SeqCst) {
            return Err(ConnectError::Refused(address.to_string()));
        }
        Ok(FakeConnection {
            node: Arc::clone(node),
        })
    }
}

pub struct FakeLiveness {
    pub cluster: Arc<Cluster>,
}

#[async_trait]
impl LivenessProbe for FakeLiveness {
    async fn probe(&self, address: &str) -> Result<(), ProbeError> {
        let node = self
            .cluster
            .node(address)
            .ok_or_else(|| ProbeError::Transport(format!("unknown node {}", address)))?;
        node.liveness_checks.fetch_add(1, Ordering::SeqCst);

        if node.hang_liveness.load(Ordering::SeqCst) {
            return futures::future::pending().await;
        }
        if node.is_up() {
            Ok(())
        } else {
            Err(ProbeError::Status(503))
        }
    }
}

pub type FakeBalancer = Balancer<FakeConnector, FakeLiveness>;

pub fn settings(backoff: Duration) -> BalanceSettings {
    BalanceSettings {
        probe_timeout: Duration::from_millis(200),
        recovery_backoff: backoff,
    }
}

/// Balancer over every node of `cluster` with a 10 minute backoff
pub async fn build(cluster: &Arc<Cluster>, clock: &Arc<ManualClock>) -> Result<FakeBalancer, BalancerError> {
    build_with(cluster.addresses(), cluster, clock).await
}

pub async fn build_with(
    addresses: Vec<String>,
    cluster: &Arc<Cluster>,
    clock: &Arc<ManualClock>,
) -> Result<FakeBalancer, BalancerError> {
    Balancer::new(
        addresses,
        FakeConnector {
            cluster: Arc::clone(cluster),
        },
        FakeLiveness {
            cluster: Arc::clone(cluster),
        },
        clock.clone(),
        settings(Duration::from_secs(10 * 60)),
    )
    .await
}

/// Indices returned by `n` consecutive selections (`None` mapped to `usize::MAX`)
pub async fn picks(balancer: &FakeBalancer, n: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(balancer.select().await.map(|s| s.index).unwrap_or(usize::MAX));
    }
    out
}
