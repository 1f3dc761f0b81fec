//! s3balancer - client-side round-robin load balancing over MinIO / S3 endpoints
//!
//! Hands out one currently-healthy endpoint per call, skipping endpoints that
//! failed until their recovery backoff has elapsed.

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod lb;
pub mod s3;

pub use config::BalancerConfig;
pub use error::BalancerError;
pub use lb::{Balancer, Selection};
