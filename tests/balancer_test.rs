mod common;

use chrono::Duration as ChronoDuration;
use common::{build, build_with, picks, Cluster};
use s3balancer::clock::{Clock, ManualClock};
use s3balancer::error::BalancerError;
use s3balancer::lb::EndpointHealth;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Round-robin over healthy endpoints
#[tokio::test]
async fn test_round_robin_cycles_in_order() {
    let cluster = Cluster::new(3);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    assert_eq!(picks(&balancer, 7).await, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[tokio::test]
async fn test_selection_carries_address_and_connection() {
    let cluster = Cluster::new(2);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    let first = balancer.select().await.unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(first.address, "node-0");
    assert!(Arc::ptr_eq(&first.connection.node, &cluster.nodes[0]));

    let second = balancer.select().await.unwrap();
    assert_eq!(second.address, "node-1");
    assert_eq!(balancer.address(1), Some("node-1"));
    assert_eq!(balancer.address(2), None);
    assert_eq!(balancer.endpoint_count(), 2);
}

/// Three endpoints, the middle one dies between selections
#[tokio::test]
async fn test_failed_endpoint_is_skipped_for_next() {
    let cluster = Cluster::new(3);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    assert_eq!(picks(&balancer, 1).await, vec![0]);

    cluster.nodes[1].set_up(false);
    assert_eq!(picks(&balancer, 1).await, vec![2]);

    // node-1 stays out of rotation without being pinged again
    let pings_after_failure = cluster.nodes[1].pings();
    assert_eq!(picks(&balancer, 4).await, vec![0, 2, 0, 2]);
    assert_eq!(cluster.nodes[1].pings(), pings_after_failure);
    assert_eq!(cluster.nodes[1].liveness_checks(), 0);

    let status = balancer.status().await;
    assert_eq!(status[1].health, EndpointHealth::Backoff { since: clock.now() });
    assert!(status[0].health.is_healthy());
    assert!(status[2].health.is_healthy());
}

#[tokio::test]
async fn test_no_reprobe_inside_backoff_window() {
    let cluster = Cluster::new(2);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    cluster.nodes[1].set_up(false);
    assert_eq!(picks(&balancer, 2).await, vec![0, 0]);
    let failed_at = clock.now();

    clock.advance(ChronoDuration::minutes(9) + ChronoDuration::seconds(59));
    assert_eq!(picks(&balancer, 3).await, vec![0, 0, 0]);
    assert_eq!(cluster.nodes[1].liveness_checks(), 0);
    assert_eq!(
        balancer.status().await[1].health,
        EndpointHealth::Backoff { since: failed_at }
    );

    clock.advance(ChronoDuration::seconds(2));
    assert_eq!(
        balancer.status().await[1].health,
        EndpointHealth::Retryable { since: failed_at }
    );
    assert_eq!(picks(&balancer, 1).await, vec![0]);
    assert_eq!(cluster.nodes[1].liveness_checks(), 1);
}

#[tokio::test]
async fn test_failed_reprobe_restarts_backoff() {
    let cluster = Cluster::new(2);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    cluster.nodes[1].set_up(false);
    picks(&balancer, 2).await;

    clock.advance(ChronoDuration::minutes(10));
    picks(&balancer, 1).await;
    assert_eq!(cluster.nodes[1].liveness_checks(), 1);
    let restarted_at = clock.now();
    assert_eq!(
        balancer.status().await[1].health,
        EndpointHealth::Backoff { since: restarted_at }
    );

    // A fresh window applies from the failed retry
    clock.advance(ChronoDuration::minutes(5));
    picks(&balancer, 4).await;
    assert_eq!(cluster.nodes[1].liveness_checks(), 1);
}

#[tokio::test]
async fn test_endpoint_recovers_after_backoff() {
    let cluster = Cluster::new(2);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    cluster.nodes[1].set_up(false);
    assert_eq!(picks(&balancer, 2).await, vec![0, 0]);
    let connects_before = cluster.nodes[1].connects.load(Ordering::SeqCst);

    cluster.nodes[1].set_up(true);
    clock.advance(ChronoDuration::minutes(10) + ChronoDuration::seconds(1));

    let recovered = balancer.select().await.unwrap();
    assert_eq!(recovered.index, 1);
    assert_eq!(cluster.nodes[1].liveness_checks(), 1);
    assert_eq!(cluster.nodes[1].connects.load(Ordering::SeqCst), connects_before + 1);
    assert!(balancer.status().await[1].health.is_healthy());

    assert_eq!(picks(&balancer, 4).await, vec![0, 1, 0, 1]);
}

#[tokio::test]
async fn test_reconnect_failure_keeps_endpoint_down() {
    let cluster = Cluster::new(2);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    cluster.nodes[1].set_up(false);
    picks(&balancer, 2).await;

    // Liveness passes, but a new client cannot be built
    cluster.nodes[1].set_up(true);
    cluster.nodes[1].refuse_connect.store(true, Ordering::SeqCst);
    clock.advance(ChronoDuration::minutes(11));

    assert_eq!(picks(&balancer, 1).await, vec![0]);
    assert_eq!(cluster.nodes[1].liveness_checks(), 1);
    assert_eq!(
        balancer.status().await[1].health,
        EndpointHealth::Backoff { since: clock.now() }
    );
}

#[tokio::test]
async fn test_hung_liveness_check_is_bounded() {
    let cluster = Cluster::new(2);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    cluster.nodes[1].set_up(false);
    cluster.nodes[1].hang_liveness.store(true, Ordering::SeqCst);
    assert_eq!(picks(&balancer, 2).await, vec![0, 0]);

    clock.advance(ChronoDuration::minutes(11));
    // Two endpoints at a 200ms probe timeout each
    let selected = tokio::time::timeout(Duration::from_secs(3), picks(&balancer, 2))
        .await
        .expect("select must not hang on a stuck liveness check");

    assert_eq!(selected, vec![0, 0]);
    assert_eq!(cluster.nodes[1].liveness_checks(), 1);
    assert_eq!(
        balancer.status().await[1].health,
        EndpointHealth::Backoff { since: clock.now() }
    );
}

#[tokio::test]
async fn test_all_unhealthy_returns_none() {
    let cluster = Cluster::new(3);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    assert_eq!(picks(&balancer, 1).await, vec![0]);
    let pings_before: Vec<usize> = cluster.nodes.iter().map(|n| n.pings()).collect();
    for node in &cluster.nodes {
        node.set_up(false);
    }

    assert!(balancer.select().await.is_none());
    // Each endpoint was examined exactly once
    for (node, before) in cluster.nodes.iter().zip(&pings_before) {
        assert_eq!(node.pings(), before + 1);
    }

    // Everything is in backoff now: no probes at all
    assert!(balancer.select().await.is_none());
    for (node, before) in cluster.nodes.iter().zip(&pings_before) {
        assert_eq!(node.pings(), before + 1);
        assert_eq!(node.liveness_checks(), 0);
    }
    assert!(balancer.status().await.iter().all(|s| !s.health.is_healthy()));
}

#[tokio::test]
async fn test_empty_endpoint_list_is_rejected() {
    let cluster = Cluster::new(0);
    let clock = Arc::new(ManualClock::default());

    let err = build_with(Vec::new(), &cluster, &clock).await.err().unwrap();
    assert!(matches!(err, BalancerError::Configuration(_)));
}

#[tokio::test]
async fn test_construction_fails_when_nothing_is_reachable() {
    let cluster = Cluster::new(3);
    for node in &cluster.nodes {
        node.set_up(false);
    }
    let clock = Arc::new(ManualClock::default());

    let err = build(&cluster, &clock).await.err().unwrap();
    assert!(matches!(err, BalancerError::NoHealthyEndpoints(3)));
}

#[tokio::test]
async fn test_construction_tolerates_partial_failure() {
    let cluster = Cluster::new(3);
    cluster.nodes[0].refuse_connect.store(true, Ordering::SeqCst);
    cluster.nodes[2].set_up(false);
    let clock = Arc::new(ManualClock::default());

    let balancer = build(&cluster, &clock).await.unwrap();
    let status = balancer.status().await;
    assert_eq!(status[0].health, EndpointHealth::Backoff { since: clock.now() });
    assert!(status[1].health.is_healthy());
    assert_eq!(status[2].health, EndpointHealth::Backoff { since: clock.now() });

    assert_eq!(picks(&balancer, 3).await, vec![1, 1, 1]);
}

#[tokio::test]
async fn test_unknown_address_counts_as_down() {
    let cluster = Cluster::new(1);
    let clock = Arc::new(ManualClock::default());
    let addresses = vec!["node-0".to_string(), "elsewhere:9000".to_string()];

    let balancer = build_with(addresses, &cluster, &clock).await.unwrap();
    assert_eq!(picks(&balancer, 2).await, vec![0, 0]);
}

#[tokio::test]
async fn test_status_does_not_probe() {
    let cluster = Cluster::new(2);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();
    let pings: Vec<usize> = cluster.nodes.iter().map(|n| n.pings()).collect();

    cluster.nodes[0].set_up(false);
    let status = balancer.status().await;

    assert_eq!(status.len(), 2);
    assert_eq!(status[0].address, "node-0");
    assert!(status[0].health.is_healthy());
    assert_eq!(cluster.nodes.iter().map(|n| n.pings()).collect::<Vec<_>>(), pings);
}

#[tokio::test]
async fn test_shutdown_releases_connections() {
    let cluster = Cluster::new(3);
    let clock = Arc::new(ManualClock::default());
    let balancer = build(&cluster, &clock).await.unwrap();

    for node in &cluster.nodes {
        assert_eq!(Arc::strong_count(node), 2);
    }

    balancer.shutdown();
    for node in &cluster.nodes {
        assert_eq!(Arc::strong_count(node), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_selection_is_fair() {
    let cluster = Cluster::new(4);
    let clock = Arc::new(ManualClock::default());
    let balancer = Arc::new(build(&cluster, &clock).await.unwrap());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let balancer = Arc::clone(&balancer);
            tokio::spawn(async move {
                let mut seen = Vec::with_capacity(25);
                for _ in 0..25 {
                    seen.push(balancer.select().await.map(|s| s.index));
                }
                seen
            })
        })
        .collect();

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for result in futures::future::join_all(tasks).await {
        for index in result.unwrap() {
            let index = index.expect("every endpoint is healthy");
            assert!(index < 4);
            *counts.entry(index).or_default() += 1;
        }
    }

    assert_eq!(counts.len(), 4);
    assert!(counts.values().all(|&c| c == 50));
}
