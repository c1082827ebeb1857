//! waygauge-rapl: package power widget binary for Waybar.

use anyhow::Context;
use clap::Parser;
use waygauge_core::cli::{launch, CommonArgs};
use waygauge_rapl::{rapl::NAME, RaplSensor};

/// Command-line arguments for the power widget.
#[derive(Parser)]
#[command(name = "waygauge-rapl")]
#[command(about = "RAPL package power widget for waygauge")]
#[command(version)]
#[command(author)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    launch(NAME, &args.common, RaplSensor::from_entries)
        .await
        .context("Power widget failed")
}
