//! Endpoint selection and health tracking
//!
//! # Components
//!
//! - [`EndpointState`]: one configured endpoint, either connected or down since a given time
//! - [`FailureTracker`]: failure timestamps and the recovery backoff window
//! - [`HealthProbe`]: probes an endpoint through its connection, or with a plain
//!   HTTP GET to `/minio/health/live` when it has none
//! - `Selector`: round-robin scan that skips endpoints in backoff
//! - [`Balancer`]: owns the state behind one mutex and exposes `select()`
//!
//! # Selection
//!
//! Each call to [`Balancer::select`] examines at most one full cycle of endpoints,
//! starting at the shared cursor. The cursor advances on every attempt. A
//! connected endpoint is probed through its connection; an endpoint that fails
//! is dropped from rotation and only re-probed once the recovery backoff has
//! elapsed since it first failed.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use s3balancer::config::BalancerConfig;
//! use s3balancer::lb::Balancer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BalancerConfig::new(
//!     vec!["minio-1:9000".to_string(), "minio-2:9000".to_string()],
//!     "ACCESS".to_string(),
//!     "SECRET".to_string(),
//! );
//! let balancer = Balancer::from_config(&config).await?;
//!
//! if let Some(selection) = balancer.select().await {
//!     let buckets = selection.connection.list_buckets().await?;
//!     println!("{} has {} buckets", selection.address, buckets.len());
//! }
//!
//! for status in balancer.status().await {
//!     println!("{} {}", status.address, status.health.name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod balancer;
pub mod connector;
pub mod endpoint;
pub mod health;
pub mod selector;
pub mod tracker;

pub use balancer::{BalanceSettings, Balancer};
pub use connector::{Connection, Connector};
pub use endpoint::{EndpointHealth, EndpointState, EndpointStatus};
pub use health::{HealthProbe, HttpLivenessProbe, LivenessProbe, LIVENESS_PATH};
pub use selector::Selection;
pub use tracker::FailureTracker;
