use clap::{Parser, Subcommand};

/// s3balancer - round-robin MinIO endpoint selection with health tracking
#[derive(Parser, Debug)]
#[command(name = "s3balancer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML config file (falls back to MINIO_* environment variables)
    #[arg(long, global = true, env = "S3BALANCER_CONFIG")]
    pub config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Repeatedly select an endpoint and report which one was chosen
    Select {
        /// Number of selections (0 = endpoint count + 2)
        #[arg(long, default_value = "0")]
        rounds: usize,

        /// Seconds to sleep between selections
        #[arg(long, default_value = "2")]
        interval: u64,
    },

    /// Show the health of every endpoint without probing
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Select an endpoint and list its buckets
    Buckets,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
