//! Minimal S3 client used as the balancer's connection handle
//!
//! This module provides:
//! - AWS Signature Version 4 signing
//! - An endpoint-bound client whose only operation is ListBuckets
//! - [`S3Connector`], which builds one client per endpoint address

pub mod client;
pub mod connector;
pub mod signer;
pub mod types;

pub use client::{Result, S3Client, S3Error};
pub use connector::S3Connector;
pub use signer::S3SignerV4;
pub use types::{Bucket, Credentials};
