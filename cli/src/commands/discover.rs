use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use tracing::{Instrument, info, info_span};

use camscout_common::config::Config;
use camscout_common::models::{
    ADDRESS, DiscoveredDevice, FIRMWARE_VERSION, PORT, SECRET_PATH, SERIAL_NUMBER,
};
use camscout_common::network::range::IpCollection;
use camscout_common::network::target::Target;
use camscout_core::discovery::DiscoveryService;
use camscout_core::scanner::ProgressCallback;

use crate::commands::DiscoverArgs;
use crate::terminal::{colors, print};

type Detail = (String, ColoredString);

pub async fn discover(args: DiscoverArgs, quiet: u8) -> anyhow::Result<()> {
    let cfg: Config = build_config(&args, quiet)?;
    let service = DiscoveryService::from_config(&cfg)?;

    let targets: IpCollection = if cfg.mode.includes_netscan() {
        args.target.unwrap_or(Target::Lan).to_collection()?
    } else {
        IpCollection::new()
    };

    let on_found: ProgressCallback = std::sync::Arc::new(|total| {
        info!("{total} device(s) answered so far");
    });

    let start_time: Instant = Instant::now();
    let devices: Vec<DiscoveredDevice> = service
        .perform_discovery(targets, Some(on_found))
        .instrument(info_span!("discovery"))
        .await?;

    discovery_ends(&devices, start_time.elapsed(), &cfg)
}

/// Config file first, then every flag that was given on top.
fn build_config(args: &DiscoverArgs, quiet: u8) -> anyhow::Result<Config> {
    let mut cfg: Config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(ports) = &args.ports {
        cfg.ports = ports.clone();
    }
    if let Some(timeout) = args.timeout {
        cfg.set_probe_timeout(timeout);
    }
    if let Some(mode) = args.mode {
        cfg.mode = mode;
    }
    if let Some(concurrency) = args.concurrency {
        cfg.max_concurrency = concurrency;
    }
    if let Some(path) = &args.credentials {
        cfg.credentials_file = Some(path.clone());
    }
    if let Some(auth_mode) = args.auth_mode {
        cfg.default_auth_mode = auth_mode;
    }
    if let Some(secret_path) = &args.secret_path {
        cfg.default_secret_path = secret_path.clone();
    }
    cfg.json |= args.json;
    cfg.quiet = cfg.quiet.max(quiet);

    if cfg.ports.is_empty() {
        anyhow::bail!("At least one port is required");
    }
    Ok(cfg)
}

fn discovery_ends(
    devices: &[DiscoveredDevice],
    total_time: Duration,
    cfg: &Config,
) -> anyhow::Result<()> {
    if cfg.json {
        let json = serde_json::to_string_pretty(devices).context("Failed to encode devices")?;
        print::print(&json);
        return Ok(());
    }

    if devices.is_empty() {
        print::header("zero cameras detected", cfg.quiet);
        print::no_results(cfg.quiet);
        return Ok(());
    }

    print::header("Camera Discovery", cfg.quiet);
    if cfg.quiet < 2 {
        for (idx, device) in devices.iter().enumerate() {
            print_device_tree(device, idx);
            if idx + 1 != devices.len() {
                print::print("");
            }
        }
    }
    print_summary(devices.len(), total_time, cfg);
    Ok(())
}

fn print_summary(count: usize, total_time: Duration, cfg: &Config) {
    let cameras_text = format!("{count} cameras");
    let time_text = format!("{:.2}s", total_time.as_secs_f64());
    let visible_width =
        "Discovery Complete:  identified in ".len() + cameras_text.len() + time_text.len();
    let output = format!(
        "Discovery Complete: {} identified in {}",
        cameras_text.bold().green(),
        time_text.bold().yellow()
    );

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output, visible_width);
        }
        _ => print::print(&output),
    }
}

fn print_device_tree(device: &DiscoveredDevice, idx: usize) {
    print::tree_head(idx, &device.name);
    let mut details: Vec<Detail> = vec![("Description".to_string(), device.description.normal())];

    if let Some(props) = device.onvif_properties() {
        if let (Some(address), Some(port)) = (props.get(ADDRESS), props.get(PORT)) {
            let endpoint = format!("{address}:{port}").color(colors::ADDRESS);
            details.push(("Address".to_string(), endpoint));
        }
        for (key, label) in [(FIRMWARE_VERSION, "Firmware"), (SERIAL_NUMBER, "Serial")] {
            if let Some(value) = props.get(key) {
                details.push((label.to_string(), value.normal()));
            }
        }
        if let Some(secret_path) = props.get(SECRET_PATH) {
            details.push(("Secret".to_string(), secret_path.color(colors::IDENTIFIER)));
        }
    }

    details.push(("Labels".to_string(), device.labels.join(", ").normal()));
    print::as_tree_one_level(details);
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
