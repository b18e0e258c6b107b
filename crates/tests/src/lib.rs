//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! Covers:
//! - Config document to dashboard wiring
//! - Replay e2e: snapshot -> ingestion -> reconciler -> renderer -> dispatcher
//! - Simulated fleet e2e (no recorded stream needed)

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_config_document_builds_dashboard() {
        let toml = r#"
            [map]
            default_zoom = 12

            [filters]
            maintenance = false

            [[routes]]
            id = "r1"
            name = "Fort - Kandy"
            waypoints = [
                { lat = 6.9344, lng = 79.8428, name = "Fort" },
                { lat = 7.2906, lng = 80.6337, name = "Kandy" },
            ]
        "#;
        let config =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let mut dashboard = tracker::Dashboard::new(tracker::SceneMap::new(&config.map), &config);
        assert_eq!(contracts::MapSurface::view(dashboard.map()).zoom, 12);
        assert!(!dashboard.filter().is_enabled(&contracts::EntityStatus::Maintenance));

        let viewport = dashboard.view_route("r1").unwrap();
        assert!(viewport.is_some());
        assert_eq!(dashboard.overlays().stop_count(), 2);
        assert_eq!(dashboard.overlays().line_count(), 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use contracts::{
        Alert, Entity, EntityDelta, LinkEventKind, LinkState, SinkConfig, SinkType, StreamEvent,
        ViewFrame, ViewPayload,
    };
    use dispatcher::create_dispatcher;
    use ingestion::{
        encode_event, load_snapshot, FileSnapshotSource, IngestionPipeline, ReplayChannel,
        ReplayConfig, SimulatedFleetChannel, SimulatedFleetConfig,
    };
    use tokio::sync::mpsc;
    use tracker::{Dashboard, ReconcileEffect, Reconciler, Renderer, SceneMap};

    fn file_sink(name: &str, path: &std::path::Path) -> SinkConfig {
        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::File,
            queue_capacity: 100,
            params,
        }
    }

    /// End-to-end test: snapshot file + replay -> Dashboard -> Dispatcher
    ///
    /// Verifies the complete flow:
    /// 1. FileSnapshotSource loads the fleet
    /// 2. ReplayChannel feeds deltas and an alert through ingestion
    /// 3. Reconciler applies them, Renderer projects frames
    /// 4. Dispatcher writes every frame to a file sink
    #[tokio::test]
    async fn test_e2e_replay_pipeline() {
        observability::init_test_logging();

        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("buses.json");
        let replay_path = dir.path().join("stream.jsonl");
        let frames_path = dir.path().join("frames.jsonl");

        std::fs::write(
            &snapshot_path,
            r#"[
                {"id": 1, "plate_number": "NB-1234", "status": "running", "current_lat": 6.93, "current_lng": 79.85},
                {"id": 2, "plate_number": "NC-5678", "status": "maintenance", "current_lat": 6.90, "current_lng": 79.87}
            ]"#,
        )
        .unwrap();

        let events = [
            StreamEvent::Delta(EntityDelta::new("1").position(6.94, 79.86).speed(32.0)),
            StreamEvent::Delta(EntityDelta::new("2").status("running")),
            StreamEvent::Alert(Alert {
                category: "delay".to_string(),
                message: "Bus 1 delayed".to_string(),
                entity_id: Some("1".into()),
            }),
            StreamEvent::Delta(EntityDelta::new("1").position(91.0, 79.86)),
        ];
        let lines: Vec<String> = events.iter().map(encode_event).collect();
        std::fs::write(&replay_path, lines.join("\n")).unwrap();

        // Snapshot
        let entities = load_snapshot(&mut FileSnapshotSource::new(&snapshot_path))
            .await
            .unwrap();
        let mut config = contracts::DashboardConfig::default();
        config.filters.maintenance = false;
        let mut dashboard = Dashboard::new(SceneMap::new(&config.map), &config);
        let outcome = dashboard.load_snapshot(entities);
        assert_eq!(outcome.installed, 2);
        assert_eq!(dashboard.overlays().marker_count(), 2);
        assert_eq!(dashboard.visible_entities().len(), 1);

        // Dispatcher
        let (view_tx, view_rx) = mpsc::channel::<ViewFrame>(100);
        let dispatcher = create_dispatcher(vec![file_sink("frames", &frames_path)], view_rx).unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let mut renderer = Renderer::new();
        view_tx.send(renderer.full_frame(&dashboard)).await.unwrap();

        // Ingestion
        let mut ingestion = IngestionPipeline::new(64);
        let channel = ReplayChannel::open("replay", &replay_path, ReplayConfig::default()).unwrap();
        ingestion
            .register_channel("replay".to_string(), Box::new(channel))
            .unwrap();
        let rx = ingestion.take_receiver().unwrap();
        ingestion.start_all();

        let mut reconciler = Reconciler::new();
        let mut alerts = 0;
        let run = async {
            while let Ok(event) = rx.recv().await {
                let done = matches!(event.kind, LinkEventKind::Disconnected);
                let outcome = reconciler.handle(&mut dashboard, event);
                match outcome.effect {
                    ReconcileEffect::Applied { entity_id, .. } => {
                        if let Some(frame) = renderer.patch_frame(&dashboard, &entity_id) {
                            view_tx.send(frame).await.unwrap();
                        }
                    }
                    ReconcileEffect::Alert(alert) => {
                        alerts += 1;
                        view_tx.send(renderer.frame(ViewPayload::Alert(alert))).await.unwrap();
                    }
                    _ => {}
                }
                if done {
                    break;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("replay timed out");
        ingestion.close();

        // Reconciled state
        assert_eq!(alerts, 1);
        assert_eq!(reconciler.state(), LinkState::Disconnected);
        assert_eq!(reconciler.stats().applied, 2);
        assert_eq!(reconciler.stats().dropped, 1);
        assert_eq!(dashboard.visible_entities().len(), 2);
        let bus = dashboard.store().get("1").unwrap();
        assert_eq!(bus.speed, Some(32.0));
        assert_eq!(bus.lat, Some(6.94));
        assert_eq!(dashboard.alerts().len(), 1);

        // Dispatched frames: full + 2 patches + alert
        let frames_emitted = renderer.frames_emitted();
        drop(view_tx);
        let sinks = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sinks[0].1.write_count, frames_emitted);

        let written = std::fs::read_to_string(&frames_path).unwrap();
        let kinds: Vec<String> = written
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["payload"]["kind"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(kinds, ["full", "entity_patch", "entity_patch", "alert"]);
    }

    /// Simulated fleet drives the reconciler without any recorded stream
    #[tokio::test]
    async fn test_e2e_simulated_fleet() {
        let fleet = vec![
            Entity::new("1").with_status("running").with_position(6.93, 79.85),
            Entity::new("2").with_status("idle").with_position(6.90, 79.87),
            Entity::new("3").with_status("idle"),
        ];
        let config = contracts::DashboardConfig::default();
        let mut dashboard = Dashboard::new(SceneMap::new(&config.map), &config);
        dashboard.load_snapshot(fleet.clone());

        let channel = SimulatedFleetChannel::new(
            "sim",
            &fleet,
            SimulatedFleetConfig {
                rate_hz: 200.0,
                seed: Some(42),
                ..Default::default()
            },
        );
        assert_eq!(channel.entity_count(), 2);

        let mut ingestion = IngestionPipeline::new(256);
        ingestion
            .register_channel("sim".to_string(), Box::new(channel))
            .unwrap();
        let rx = ingestion.take_receiver().unwrap();
        ingestion.start_all();

        let mut reconciler = Reconciler::new();
        let target = 10u64;
        let run = async {
            while let Ok(event) = rx.recv().await {
                reconciler.handle(&mut dashboard, event);
                if reconciler.stats().applied >= target {
                    break;
                }
            }
        };
        let result = tokio::time::timeout(Duration::from_secs(5), run).await;
        ingestion.close();

        assert!(result.is_ok(), "simulation timed out");
        assert!(reconciler.stats().applied >= target);
        assert_eq!(reconciler.stats().upserts, 0);
        assert_eq!(reconciler.state(), LinkState::Receiving);
        assert_eq!(dashboard.store().len(), 3);
    }

    /// Test dispatcher with multiple sink types
    #[tokio::test]
    async fn test_dispatcher_multiple_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel::<ViewFrame>(10);

        let sink_configs = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: 50,
                params: HashMap::new(),
            },
            file_sink("file", &dir.path().join("frames.jsonl")),
        ];

        let dispatcher = create_dispatcher(sink_configs, rx).unwrap();
        assert_eq!(dispatcher.metrics().len(), 2);

        let handle = dispatcher.spawn();

        let mut renderer = Renderer::new();
        for state in [LinkState::Connected, LinkState::Receiving, LinkState::Disconnected] {
            tx.send(renderer.frame(ViewPayload::Link { state })).await.unwrap();
        }
        drop(tx);

        let sinks = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(sinks.iter().all(|(_, metrics)| metrics.write_count == 3));
    }
}
