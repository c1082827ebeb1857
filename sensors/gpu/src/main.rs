//! waygauge-gpu: GPU usage widget binary for Waybar.

use anyhow::Context;
use clap::Parser;
use waygauge_core::cli::{launch, CommonArgs};
use waygauge_gpu::{gpu::NAME, GpuSensor};

/// Command-line arguments for the GPU widget.
#[derive(Parser)]
#[command(name = "waygauge-gpu")]
#[command(about = "GPU usage widget for waygauge")]
#[command(version)]
#[command(author)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    launch(NAME, &args.common, GpuSensor::from_entries)
        .await
        .context("GPU widget failed")
}
