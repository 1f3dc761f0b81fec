use anyhow::Result;

use s3balancer::cli::{self, args::Cli};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    cli::init_logging(&cli.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(cli::run(cli))
}
