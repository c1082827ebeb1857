//! Network widget for waygauge.
//!
//! Picks a wired or wireless interface, reports its throughput and, for
//! wireless links, classifies signal quality into `wireless-1`..`wireless-5`.

pub mod network;

pub use network::{Interface, LinkQuality, NetworkConfig, NetworkSensor, Rates};
