//! S3 types and response structures

use serde::{Deserialize, Serialize};

/// Bucket entry from a ListBuckets response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name
    pub name: String,
    /// Creation timestamp as reported by the server (ISO 8601)
    pub creation_date: Option<String>,
}

impl Bucket {
    pub fn new(name: String) -> Self {
        Self {
            name,
            creation_date: None,
        }
    }
}

/// Access credentials shared by every endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            access_key,
            secret_key,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}
