//! waygauge-network: Network throughput widget binary for Waybar.

use anyhow::Context;
use clap::Parser;
use waygauge_core::cli::{launch, CommonArgs};
use waygauge_network::{network::NAME, NetworkSensor};

/// Command-line arguments for the Network widget.
#[derive(Parser)]
#[command(name = "waygauge-network")]
#[command(about = "Network throughput widget for waygauge")]
#[command(version)]
#[command(author)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    launch(NAME, &args.common, NetworkSensor::from_entries)
        .await
        .context("Network widget failed")
}
