//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DashboardConfig, StreamSource};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    map: MapInfo,
    filters: FilterInfo,
    snapshot: String,
    stream: StreamInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    routes: Vec<RouteInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct MapInfo {
    center: [f64; 2],
    zoom: u8,
    focus_zoom: u8,
    zoom_range: [u8; 2],
}

#[derive(Serialize)]
struct FilterInfo {
    running: bool,
    idle: bool,
    maintenance: bool,
}

#[derive(Serialize)]
struct StreamInfo {
    source: String,
    channel_capacity: usize,
    drop_policy: String,
    alert_history: usize,
}

#[derive(Serialize)]
struct RouteInfo {
    id: String,
    name: String,
    stops: usize,
    assigned: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn describe_source(source: &StreamSource) -> String {
    match source {
        StreamSource::Replay { path, rate_hz } => match rate_hz {
            Some(rate) => format!("replay {} @ {rate} Hz", path.display()),
            None => format!("replay {} (unpaced)", path.display()),
        },
        StreamSource::Simulated { rate_hz, seed, .. } => match seed {
            Some(seed) => format!("simulated @ {rate_hz} Hz (seed {seed})"),
            None => format!("simulated @ {rate_hz} Hz"),
        },
        StreamSource::None => "none".to_string(),
    }
}

fn describe_snapshot(config: &DashboardConfig) -> String {
    match &config.snapshot.path {
        Some(path) => path.display().to_string(),
        None => format!("{} inline entities", config.snapshot.entities.len()),
    }
}

fn build_config_info(config: &DashboardConfig, args: &InfoArgs) -> ConfigInfo {
    let routes = if args.routes {
        config
            .routes
            .iter()
            .map(|r| RouteInfo {
                id: r.id.to_string(),
                name: r.name.clone(),
                stops: r.waypoints.len(),
                assigned: r.assigned.len(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        config
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    let map = &config.map;
    ConfigInfo {
        version: format!("{:?}", config.version),
        map: MapInfo {
            center: [map.default_center.lat, map.default_center.lng],
            zoom: map.default_zoom,
            focus_zoom: map.focus_zoom,
            zoom_range: [map.min_zoom, map.max_zoom],
        },
        filters: FilterInfo {
            running: config.filters.running,
            idle: config.filters.idle,
            maintenance: config.filters.maintenance,
        },
        snapshot: describe_snapshot(config),
        stream: StreamInfo {
            source: describe_source(&config.stream.source),
            channel_capacity: config.stream.channel_capacity,
            drop_policy: format!("{:?}", config.stream.drop_policy),
            alert_history: config.stream.alert_history,
        },
        routes,
        sinks,
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn print_config_info(config: &DashboardConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Fleet Live View Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let map = &config.map;
    println!("📍 Map");
    println!("   ├─ Version: {:?}", config.version);
    println!(
        "   ├─ Center: {:.4}, {:.4}",
        map.default_center.lat, map.default_center.lng
    );
    println!("   ├─ Zoom: {} (focus {})", map.default_zoom, map.focus_zoom);
    println!("   └─ Zoom range: {}-{}", map.min_zoom, map.max_zoom);

    let filters = &config.filters;
    println!("\n🔎 Filters");
    println!("   ├─ Running: {}", on_off(filters.running));
    println!("   ├─ Idle: {}", on_off(filters.idle));
    println!("   └─ Maintenance: {}", on_off(filters.maintenance));

    println!("\n📡 Stream");
    println!("   ├─ Snapshot: {}", describe_snapshot(config));
    println!("   ├─ Source: {}", describe_source(&config.stream.source));
    println!(
        "   ├─ Capacity: {} ({:?})",
        config.stream.channel_capacity, config.stream.drop_policy
    );
    println!("   └─ Alert history: {}", config.stream.alert_history);

    println!("\n🛣  Routes ({})", config.routes.len());
    if args.routes {
        for (i, route) in config.routes.iter().enumerate() {
            let is_last = i == config.routes.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} {} - {} stops, {} buses",
                prefix,
                route.id,
                route.name,
                route.waypoints.len(),
                route.assigned.len()
            );
        }
    }

    if args.sinks && !config.sinks.is_empty() {
        println!("\n📤 Sinks ({})", config.sinks.len());
        for (i, sink) in config.sinks.iter().enumerate() {
            let is_last = i == config.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}
