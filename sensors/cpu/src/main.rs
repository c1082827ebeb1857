//! waygauge-cpu: CPU usage widget binary for Waybar.

use anyhow::Context;
use clap::Parser;
use waygauge_core::cli::{launch, CommonArgs};
use waygauge_cpu::{cpu::NAME, CpuSensor};

/// Command-line arguments for the CPU widget.
#[derive(Parser)]
#[command(name = "waygauge-cpu")]
#[command(about = "CPU usage widget for waygauge")]
#[command(version)]
#[command(author)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    launch(NAME, &args.common, CpuSensor::from_entries)
        .await
        .context("CPU widget failed")
}
