//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{DashboardConfig, StreamSource};
use std::time::Duration;
use tracing::{error, info, warn};
use tracker::UiAction;

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config).context("Invalid command-line overrides")?;

    let actions = parse_actions(&args.actions)?;

    info!(
        routes = config.routes.len(),
        sinks = config.sinks.len(),
        source = source_name(&config.stream.source),
        actions = actions.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        dashboard: config,
        max_events: (args.max_events > 0).then_some(args.max_events),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        replay_loop: args.replay_loop,
        actions,
        scene_out: args.scene_out.clone(),
    };

    let pipeline = Pipeline::new(pipeline_config);
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting live view...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Live view failed")?;
            info!(
                events = stats.events_received,
                frames = stats.frames_emitted,
                duration_secs = stats.duration.as_secs_f64(),
                events_per_sec = format!("{:.2}", stats.events_per_sec()),
                "Live view completed"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping live view...");
        }
    }

    info!("fleetview finished");
    Ok(())
}

/// Apply CLI overrides on top of the loaded configuration
fn apply_overrides(config: &mut DashboardConfig, args: &RunArgs) {
    if let Some(path) = &args.snapshot {
        info!(path = %path.display(), "Overriding snapshot from CLI");
        config.snapshot.path = Some(path.clone());
    }

    if let Some(path) = &args.replay {
        info!(path = %path.display(), "Overriding stream source with replay");
        config.stream.source = StreamSource::Replay {
            path: path.clone(),
            rate_hz: args.replay_rate,
        };
    } else if let Some(rate_hz) = args.simulate_rate {
        info!(rate_hz, "Overriding stream source with simulation");
        config.stream.source = StreamSource::Simulated {
            rate_hz,
            seed: args.seed,
            step_deg: 0.0005,
        };
    }

    if let Some(capacity) = args.buffer_size {
        config.stream.channel_capacity = capacity;
    }
}

/// Parse `--action` JSON arguments
fn parse_actions(raw: &[String]) -> Result<Vec<UiAction>> {
    raw.iter()
        .map(|text| {
            serde_json::from_str(text).with_context(|| format!("Invalid --action JSON: {text}"))
        })
        .collect()
}

fn source_name(source: &StreamSource) -> &'static str {
    match source {
        StreamSource::Replay { .. } => "replay",
        StreamSource::Simulated { .. } => "simulated",
        StreamSource::None => "none",
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
///
/// A handler that fails to install never fires.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &DashboardConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Map:");
    println!(
        "  Center: {:.4}, {:.4} (zoom {})",
        config.map.default_center.lat, config.map.default_center.lng, config.map.default_zoom
    );

    match (&config.snapshot.path, config.snapshot.entities.len()) {
        (Some(path), _) => println!("\nSnapshot: {}", path.display()),
        (None, 0) => println!("\nSnapshot: (empty)"),
        (None, n) => println!("\nSnapshot: {n} inline entities"),
    }

    println!("\nStream: {}", source_name(&config.stream.source));
    println!("  Capacity: {}", config.stream.channel_capacity);
    println!("  Drop policy: {:?}", config.stream.drop_policy);

    if !config.routes.is_empty() {
        println!("\nRoutes ({}):", config.routes.len());
        for route in &config.routes {
            println!("  - {} ({}) - {} stops", route.id, route.name, route.waypoints.len());
        }
    }

    if !config.sinks.is_empty() {
        println!("\nSinks ({}):", config.sinks.len());
        for sink in &config.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn run_args(args: &[&str]) -> RunArgs {
        let mut argv = vec!["fleetview", "run"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn replay_override_replaces_source() {
        let mut config = DashboardConfig::default();
        apply_overrides(
            &mut config,
            &run_args(&["--replay", "stream.jsonl", "--replay-rate", "5", "--buffer-size", "8"]),
        );
        assert_eq!(
            config.stream.source,
            StreamSource::Replay {
                path: "stream.jsonl".into(),
                rate_hz: Some(5.0)
            }
        );
        assert_eq!(config.stream.channel_capacity, 8);
    }

    #[test]
    fn simulate_override_keeps_seed() {
        let mut config = DashboardConfig::default();
        apply_overrides(&mut config, &run_args(&["--simulate-rate", "2", "--seed", "9"]));
        assert!(matches!(
            config.stream.source,
            StreamSource::Simulated { seed: Some(9), .. }
        ));
    }

    #[test]
    fn actions_parse_from_json() {
        let actions = parse_actions(&[
            r#"{"action": "select", "id": 3}"#.to_string(),
            r#"{"action": "zoom_in"}"#.to_string(),
        ])
        .unwrap();
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[1], UiAction::ZoomIn));

        assert!(parse_actions(&["{\"action\": \"launch\"}".to_string()]).is_err());
    }
}
