//! Basic usage example for s3balancer
//!
//! Balances requests over the endpoints in MINIO_ENDPOINTS (see `.env` support
//! in `config::load_from_env`) and lists buckets through each selection.
//!
//! Run with:
//! ```
//! MINIO_ENDPOINTS=localhost:9000,localhost:9001 \
//! MINIO_ACCESS_KEY=minioadmin MINIO_SECRET_KEY=minioadmin \
//! cargo run --example basic_usage
//! ```

use anyhow::Result;
use s3balancer::{config, Balancer};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    s3balancer::cli::init_logging("info");

    let config = config::load_config(None)?;
    let balancer = Balancer::from_config(&config).await?;

    println!("s3balancer - Basic Usage Example");
    println!("================================\n");

    for attempt in 1..=balancer.endpoint_count() + 2 {
        let Some(selection) = balancer.select().await else {
            println!("{}. No healthy endpoint right now", attempt);
            tokio::time::sleep(Duration::from_secs(2)).await;
            continue;
        };

        match selection.connection.list_buckets().await {
            Ok(buckets) => {
                let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
                println!("{}. {} -> {} bucket(s) {:?}", attempt, selection.address, buckets.len(), names);
            }
            Err(e) => println!("{}. {} -> ListBuckets failed: {}", attempt, selection.address, e),
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    println!("\nEndpoint status:");
    for status in balancer.status().await {
        println!("  [{}] {:<30} {}", status.index, status.address, status.health.name());
    }

    balancer.shutdown();
    Ok(())
}
