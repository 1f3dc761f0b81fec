use anyhow::{Context, Result};
use std::fmt::Write as FmtWrite;
use std::time::Duration;

use crate::lb::{Balancer, EndpointHealth, EndpointStatus};

/// Select an endpoint `rounds` times, sleeping `interval` seconds in between
pub async fn cmd_select(balancer: &Balancer, rounds: usize, interval: u64) -> Result<()> {
    let rounds = if rounds == 0 {
        balancer.endpoint_count() + 2
    } else {
        rounds
    };

    for attempt in 1..=rounds {
        match balancer.select().await {
            Some(selection) => println!(
                "Attempt {}: selected {} (index {})",
                attempt, selection.address, selection.index
            ),
            None => println!("Attempt {}: no endpoints available right now", attempt),
        }

        if attempt < rounds {
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }

    Ok(())
}

/// Print the current health of every endpoint
pub async fn cmd_status(balancer: &Balancer, json: bool) -> Result<()> {
    let statuses = balancer.status().await;

    if json {
        let out = serde_json::to_string_pretty(&statuses).context("Failed to serialize status")?;
        println!("{}", out);
    } else {
        print!("{}", format_status_table(&statuses));
    }

    Ok(())
}

/// List buckets through the next selected endpoint
pub async fn cmd_buckets(balancer: &Balancer) -> Result<()> {
    let selection = balancer
        .select()
        .await
        .ok_or_else(|| anyhow::anyhow!("No healthy endpoints available"))?;

    let buckets = selection
        .connection
        .list_buckets()
        .await
        .context(format!("ListBuckets failed on {}", selection.address))?;

    println!("Buckets on {} (index {}):", selection.address, selection.index);
    if buckets.is_empty() {
        println!("  (none)");
    }
    for bucket in buckets {
        match bucket.creation_date {
            Some(created) => println!("  {:<40} {}", bucket.name, created),
            None => println!("  {}", bucket.name),
        }
    }

    Ok(())
}

pub fn format_status_table(statuses: &[EndpointStatus]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<40} {:<10} {}", "INDEX", "ENDPOINT", "STATE", "FAILED SINCE");
    for status in statuses {
        let since = match status.health {
            EndpointHealth::Healthy => "-".to_string(),
            EndpointHealth::Backoff { since } | EndpointHealth::Retryable { since } => {
                since.format("%Y-%m-%d %H:%M:%S UTC").to_string()
            }
        };
        let _ = writeln!(
            out,
            "{:<6} {:<40} {:<10} {}",
            status.index,
            status.address,
            status.health.name(),
            since
        );
    }
    out
}
