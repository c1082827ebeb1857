//! waygauge-thermal: temperature widget binary for Waybar.

use anyhow::Context;
use clap::Parser;
use waygauge_core::cli::{launch, CommonArgs};
use waygauge_thermal::{thermal::NAME, ThermalSensor};

/// Command-line arguments for the temperature widget.
#[derive(Parser)]
#[command(name = "waygauge-thermal")]
#[command(about = "Temperature widget for waygauge")]
#[command(version)]
#[command(author)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    launch(NAME, &args.common, ThermalSensor::from_entries)
        .await
        .context("Temperature widget failed")
}
