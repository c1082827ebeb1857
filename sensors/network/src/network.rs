//! Network throughput widget.
//!
//! Interfaces come from `/sys/class/net`, wireless link quality from
//! `/proc/net/wireless` and addresses from `ip addr`. Throughput is the change of the byte counters of
//! the selected interface divided by the time between two readings.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};
use waygauge_core::classify::classify;
use waygauge_core::cli::Configured;
use waygauge_core::format::scale_bytes;
use waygauge_core::{
    read_value, ConfigEntry, Direction, EventKind, EventResponse, FormatArg, GaugeError, Logger,
    ParsedConfig, Sensor, WaybarOutput, Widget,
};

/// Widget name, also the configuration file stem.
pub const NAME: &str = "network";

const DEFAULT_NET_ROOT: &str = "/sys/class/net";
const DEFAULT_WIRELESS_PATH: &str = "/proc/net/wireless";
const DEFAULT_MAX_BANDWIDTH: u64 = 1000;
const DISCONNECTED: &str = "disconnected";
const WIRED: &str = "wired";
const WIRELESS: &str = "wireless";
const WIRELESS_STATE_PREFIX: &str = "wireless-";
const BANDWIDTH: &str = "{icon}\u{2004}{bandwidthRx:>5}\u{2004}{bandwidthTx:>5}";

/// Network widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub base: ParsedConfig<i64>,
    /// Interface to monitor; auto-selected when unset or missing.
    pub interface: Option<String>,
    /// Link capacity in Mbit/s, used for `percentage`. Zero disables it.
    pub max_bandwidth: u64,
    pub net_root: PathBuf,
    pub wireless_path: PathBuf,
}

impl NetworkConfig {
    /// Defaults overlaid with `entries`.
    pub fn parse<I>(entries: I, logger: &dyn Logger) -> Self
    where
        I: IntoIterator<Item = ConfigEntry>,
    {
        let base = ParsedConfig::new()
            .with_icon("default", "󰈀")
            .with_icon(DISCONNECTED, "󱞐")
            .with_icon(WIRED, "󰈀")
            .with_icon(WIRELESS, "󰖩")
            .with_icon("wireless-1", "󰤯")
            .with_icon("wireless-2", "󰤟")
            .with_icon("wireless-3", "󰤢")
            .with_icon("wireless-4", "󰤥")
            .with_icon("wireless-5", "󰤨")
            .with_format("default", BANDWIDTH)
            .with_format(DISCONNECTED, "{icon}")
            .with_format(WIRED, BANDWIDTH)
            .with_format(WIRELESS, BANDWIDTH)
            .with_threshold("wireless-1", 20)
            .with_threshold("wireless-2", 40)
            .with_threshold("wireless-3", 60)
            .with_threshold("wireless-4", 80)
            .with_threshold("wireless-5", 100)
            .with_tooltip_format(
                "Interface: {ifname}\nIP: {ipaddr}\nIPv6: {ipv6}\n\
                 RX Total: {bandwidthRxTot}\nTX Total: {bandwidthTxTot}\n\
                 RX Rate: {bandwidthRx}\nTX Rate: {bandwidthTx}\n\
                 Net Speed: {netspeed}",
            )
            .with_action(EventKind::OnMiddleClick, "LANG=en_US.UTF-8 iwmenu -l rofi")
            .parse(entries, logger);

        let interface = base.raw("interface").filter(|name| !name.is_empty()).map(str::to_owned);
        let max_bandwidth = base.value("max-bandwidth", DEFAULT_MAX_BANDWIDTH, logger);
        let net_root = PathBuf::from(base.string("net-root", DEFAULT_NET_ROOT));
        let wireless_path = PathBuf::from(base.string("wireless-path", DEFAULT_WIRELESS_PATH));

        Self {
            base,
            interface,
            max_bandwidth,
            net_root,
            wireless_path,
        }
    }
}

/// Link quality of a wireless interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkQuality {
    pub link: i64,
    /// Signal level, dBm.
    pub level: i64,
    /// Noise level, dBm.
    pub noise: i64,
}

/// Parse the `/proc/net/wireless` table into per-interface link quality.
///
/// The two header lines are skipped; values such as `54.` lose their
/// trailing dot. Rows that do not parse are left out.
#[must_use]
pub fn parse_wireless(content: &str) -> BTreeMap<String, LinkQuality> {
    let number = |field: &str| field.trim_end_matches('.').parse::<f64>().ok().map(|v| v as i64);

    content
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (name, rest) = line.split_once(':')?;
            let fields: Vec<&str> = rest.split_whitespace().collect();
            let quality = LinkQuality {
                link: number(fields.get(1)?)?,
                level: number(fields.get(2)?)?,
                noise: number(fields.get(3)?)?,
            };
            Some((name.trim().to_owned(), quality))
        })
        .collect()
}

/// Addresses assigned to an interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addresses {
    pub ipv4: Option<String>,
    pub prefix: Option<u8>,
    /// First address that is not link-local.
    pub ipv6: Option<String>,
}

impl Addresses {
    /// `address/prefix`, or empty without an IPv4 address.
    #[must_use]
    pub fn cidr(&self) -> String {
        match (&self.ipv4, self.prefix) {
            (Some(ip), Some(prefix)) => format!("{ip}/{prefix}"),
            (Some(ip), None) => ip.clone(),
            (None, _) => String::new(),
        }
    }
}

/// Parse `ip -o addr show` output.
///
/// The first `inet` line gives the IPv4 address and prefix; `fe80::`
/// addresses are skipped when looking for IPv6.
#[must_use]
pub fn parse_ip_addr(output: &str) -> Addresses {
    let mut addresses = Addresses::default();
    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let Some(family) = fields.by_ref().find(|f| *f == "inet" || *f == "inet6") else {
            continue;
        };
        let Some((address, prefix)) = fields.next().map(|a| a.split_once('/').unwrap_or((a, ""))) else {
            continue;
        };

        if family == "inet" && addresses.ipv4.is_none() {
            addresses.ipv4 = Some(address.to_owned());
            addresses.prefix = prefix.parse().ok();
        } else if family == "inet6"
            && addresses.ipv6.is_none()
            && !address.to_ascii_lowercase().starts_with("fe80")
        {
            addresses.ipv6 = Some(address.to_owned());
        }
    }
    addresses
}

/// Look up the addresses of an interface.
pub type AddressProbe = fn(&str) -> Addresses;

/// Ask `ip` for the addresses of `interface`.
#[must_use]
pub fn ip_addr(interface: &str) -> Addresses {
    Command::new("ip")
        .args(["-o", "addr", "show", "dev", interface])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| parse_ip_addr(&String::from_utf8_lossy(&output.stdout)))
        .unwrap_or_default()
}

/// One network interface as seen in sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub up: bool,
    pub wireless: bool,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub quality: LinkQuality,
    pub addresses: Addresses,
}

impl Interface {
    /// Candidates for auto-selection: ethernet (`e*`) or wireless (`w*`).
    #[must_use]
    pub fn is_candidate(&self) -> bool {
        self.name.starts_with('e') || self.name.starts_with('w')
    }

    /// Up and holding an IPv4 address.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.up && self.addresses.ipv4.is_some()
    }
}

/// List the interfaces below `net_root`, sorted by name, without `lo`.
///
/// Counters that cannot be read are reported as zero. Addresses are only
/// looked up for interfaces that are up.
///
/// # Errors
///
/// Returns an error if `net_root` cannot be listed.
pub fn scan_interfaces(
    net_root: &Path,
    wireless_path: &Path,
    address_probe: AddressProbe,
) -> Result<Vec<Interface>, GaugeError> {
    let wireless = fs::read_to_string(wireless_path)
        .map(|content| parse_wireless(&content))
        .unwrap_or_default();

    let mut interfaces = Vec::new();
    for entry in fs::read_dir(net_root)?.flatten() {
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if name == "lo" {
            continue;
        }

        let dir = entry.path();
        let up = fs::read_to_string(dir.join("operstate")).is_ok_and(|state| state.trim() == "up");
        let stat = |counter: &str| read_value::<u64>(&dir.join("statistics").join(counter)).unwrap_or(0);
        let quality = wireless.get(&name).copied();

        interfaces.push(Interface {
            up,
            wireless: quality.is_some() || dir.join("wireless").is_dir(),
            rx_bytes: stat("rx_bytes"),
            tx_bytes: stat("tx_bytes"),
            quality: quality.unwrap_or_default(),
            addresses: if up { address_probe(&name) } else { Addresses::default() },
            name,
        });
    }
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(interfaces)
}

/// Pick the interface to report on.
///
/// A configured interface wins when it exists. Otherwise the first wired
/// interface that is connected, then the first wireless one.
pub fn select_interface<'a>(
    interfaces: &'a [Interface],
    configured: Option<&str>,
    logger: &dyn Logger,
) -> Option<&'a Interface> {
    if let Some(name) = configured {
        if let Some(found) = interfaces.iter().find(|i| i.name == name) {
            return Some(found);
        }
        logger.warning(&format!("Configured interface '{name}' not found, auto-selecting"));
    }

    let usable = || interfaces.iter().filter(|i| i.is_connected() && i.is_candidate());
    usable()
        .find(|i| !i.wireless && i.name.starts_with('e'))
        .or_else(|| usable().find(|i| i.wireless))
}

/// Look up the ESSID an interface is associated with.
pub type EssidProbe = fn(&str) -> Option<String>;

/// Ask `iwgetid` for the ESSID.
#[must_use]
pub fn iwgetid(interface: &str) -> Option<String> {
    let output = Command::new("iwgetid").args(["-r", interface]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let essid = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    (!essid.is_empty()).then_some(essid)
}

/// Throughput of one interface in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rates {
    pub rx: u64,
    pub tx: u64,
}

#[derive(Debug, Clone)]
struct Counters {
    interface: String,
    rx_bytes: u64,
    tx_bytes: u64,
    at: Instant,
}

/// Network sensor.
#[derive(Debug)]
pub struct NetworkSensor {
    widget: Widget<i64>,
    interface: Option<String>,
    max_bandwidth: u64,
    net_root: PathBuf,
    wireless_path: PathBuf,
    essid_probe: EssidProbe,
    address_probe: AddressProbe,
    prev: Option<Counters>,
}

impl NetworkSensor {
    #[must_use]
    pub fn new(config: NetworkConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            widget: Widget::new(NAME, config.base, logger),
            interface: config.interface,
            max_bandwidth: config.max_bandwidth,
            net_root: config.net_root,
            wireless_path: config.wireless_path,
            essid_probe: iwgetid,
            address_probe: ip_addr,
            prev: None,
        }
    }

    pub fn from_entries(entries: Vec<ConfigEntry>, logger: Arc<dyn Logger>) -> Result<Self, GaugeError> {
        let config = NetworkConfig::parse(entries, logger.as_ref());
        Ok(Self::new(config, logger))
    }

    /// Replace the ESSID lookup.
    #[must_use]
    pub fn with_essid_probe(mut self, probe: EssidProbe) -> Self {
        self.essid_probe = probe;
        self
    }

    /// Replace the address lookup.
    #[must_use]
    pub fn with_address_probe(mut self, probe: AddressProbe) -> Self {
        self.address_probe = probe;
        self
    }

    /// Signal-quality state among the `wireless-*` thresholds.
    #[must_use]
    pub fn wireless_state(&self, link: i64) -> Option<String> {
        let thresholds: BTreeMap<String, i64> = self
            .widget
            .config()
            .thresholds()
            .iter()
            .filter(|(state, _)| state.starts_with(WIRELESS_STATE_PREFIX))
            .map(|(state, threshold)| (state.clone(), *threshold))
            .collect();
        classify(link, &thresholds, Direction::DescendingIsWorse).map(str::to_owned)
    }

    /// Rates since the previous reading of the same interface.
    ///
    /// The first reading of an interface reports zero.
    pub fn rates_at(&mut self, interface: &Interface, now: Instant) -> Rates {
        let rates = match &self.prev {
            Some(prev) if prev.interface == interface.name && now > prev.at => {
                let secs = now.duration_since(prev.at).as_secs_f64();
                let per_second = |current: u64, last: u64| (current.saturating_sub(last) as f64 / secs) as u64;
                Rates {
                    rx: per_second(interface.rx_bytes, prev.rx_bytes),
                    tx: per_second(interface.tx_bytes, prev.tx_bytes),
                }
            }
            _ => Rates::default(),
        };
        self.prev = Some(Counters {
            interface: interface.name.clone(),
            rx_bytes: interface.rx_bytes,
            tx_bytes: interface.tx_bytes,
            at: now,
        });
        rates
    }

    /// Share of `max-bandwidth` used by the combined rate.
    #[must_use]
    pub fn percentage(&self, rates: Rates) -> Option<u8> {
        if self.max_bandwidth == 0 {
            return None;
        }
        let capacity = self.max_bandwidth as f64 * 1_000_000.0 / 8.0;
        let share = (rates.rx + rates.tx) as f64 / capacity * 100.0;
        Some(share.clamp(0.0, 100.0).round() as u8)
    }

    /// Render `interface` (or the lack of one) with the given rates.
    #[must_use]
    pub fn render(&self, interface: Option<&Interface>, rates: Rates) -> WaybarOutput {
        let config = self.widget.config();
        let (state, format) = match interface {
            Some(i) if i.is_connected() && i.wireless => (
                self.wireless_state(i.quality.link)
                    .unwrap_or_else(|| WIRELESS.to_owned()),
                config.format_for_state(WIRELESS),
            ),
            Some(i) if i.is_connected() => (WIRED.to_owned(), config.format_for_state(WIRED)),
            _ => (DISCONNECTED.to_owned(), config.format_for_state(DISCONNECTED)),
        };

        let essid = interface
            .filter(|i| i.wireless && i.up)
            .and_then(|i| (self.essid_probe)(&i.name))
            .unwrap_or_default();
        let quality = interface.map(|i| i.quality).unwrap_or_default();
        let addresses = interface.map(|i| i.addresses.clone()).unwrap_or_default();
        let (rx_total, tx_total) = interface.map_or((0, 0), |i| (i.rx_bytes, i.tx_bytes));

        let args = [
            FormatArg::new("ifname", interface.map_or("None", |i| i.name.as_str())),
            FormatArg::new("ipaddr", addresses.ipv4.clone().unwrap_or_default()),
            FormatArg::new("ipv6", addresses.ipv6.clone().unwrap_or_default()),
            FormatArg::new("netcidr", addresses.cidr()),
            FormatArg::new("essid", essid),
            FormatArg::new("quality_link", quality.link),
            FormatArg::new("quality_level", quality.level),
            FormatArg::new("quality_noise", quality.noise),
            FormatArg::new("bandwidthRx", scale_bytes(rates.rx)),
            FormatArg::new("bandwidthTx", scale_bytes(rates.tx)),
            FormatArg::new("bandwidthRxTot", scale_bytes(rx_total)),
            FormatArg::new("bandwidthTxTot", scale_bytes(tx_total)),
            FormatArg::new("netspeed", scale_bytes(rates.rx + rates.tx)),
        ];
        self.widget
            .present_with(Some(state.as_str()), format, &args, self.percentage(rates))
    }

    fn sample_at(&mut self, now: Instant) -> Result<WaybarOutput, GaugeError> {
        let interfaces = scan_interfaces(&self.net_root, &self.wireless_path, self.address_probe)?;
        let selected = select_interface(&interfaces, self.interface.as_deref(), self.widget.logger());
        let rates = match selected {
            Some(interface) => self.rates_at(interface, now),
            None => Rates::default(),
        };
        Ok(self.render(selected, rates))
    }
}

impl Sensor for NetworkSensor {
    type Error = GaugeError;

    fn read(&mut self) -> Result<WaybarOutput, Self::Error> {
        self.sample_at(Instant::now())
    }

    fn name(&self) -> &str {
        self.widget.name()
    }

    fn interval(&self) -> Duration {
        self.widget.config().interval()
    }

    fn check_availability(&self) -> Result<(), Self::Error> {
        let interfaces = scan_interfaces(&self.net_root, &self.wireless_path, self.address_probe)
            .map_err(|e| GaugeError::unavailable(format!("Cannot list interfaces: {e}")))?;
        if interfaces.iter().any(|i| i.up && i.is_candidate()) {
            Ok(())
        } else {
            Err(GaugeError::temporarily_unavailable("No network interface found"))
        }
    }

    fn handle_event(&mut self, event: EventKind) -> EventResponse {
        self.widget.respond(event)
    }
}

impl Configured for NetworkSensor {
    fn config_document(&self) -> BTreeMap<String, serde_json::Value> {
        let mut document = self.widget.config().to_document();
        if let Some(interface) = &self.interface {
            document.insert("interface".to_owned(), serde_json::Value::String(interface.clone()));
        }
        document.insert("max-bandwidth".to_owned(), self.max_bandwidth.into());
        document.insert(
            "net-root".to_owned(),
            serde_json::Value::String(self.net_root.display().to_string()),
        );
        document.insert(
            "wireless-path".to_owned(),
            serde_json::Value::String(self.wireless_path.display().to_string()),
        );
        document
    }
}
