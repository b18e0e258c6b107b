//! Snapshot sources and the one-shot loader

use std::path::{Path, PathBuf};
use std::time::Instant;

use contracts::{ContractError, Entity, SnapshotSource};
use tracing::{info, instrument, warn};

/// Snapshot read from a JSON file holding an array of entity records
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    name: String,
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("file:{}", path.display()),
            path,
        }
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&mut self) -> Result<Vec<Entity>, ContractError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ContractError::snapshot_fetch(&self.name, e.to_string()))?;
        serde_json::from_str(&content)
            .map_err(|e| ContractError::snapshot_fetch(&self.name, format!("invalid snapshot: {e}")))
    }
}

/// Snapshot held in memory (inline config, tests)
#[derive(Debug, Clone, Default)]
pub struct StaticSnapshotSource {
    entities: Vec<Entity>,
}

impl StaticSnapshotSource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }
}

impl SnapshotSource for StaticSnapshotSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&mut self) -> Result<Vec<Entity>, ContractError> {
        Ok(self.entities.clone())
    }
}

/// Drop records that fail shape validation, keeping the rest in order
fn accept_valid(records: Vec<Entity>) -> Vec<Entity> {
    let total = records.len();
    let entities: Vec<Entity> = records
        .into_iter()
        .filter(|entity| match entity.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(entity_id = %entity.id, error = %e, "dropping invalid snapshot record");
                false
            }
        })
        .collect();

    let rejected = total - entities.len();
    if rejected > 0 {
        metrics::counter!("fleetview_snapshot_records_dropped_total").increment(rejected as u64);
    }
    entities
}

/// Fetch the snapshot once
///
/// A failure is logged and reported as `None`; the caller keeps its current
/// state and does not retry. Individual records that fail validation are
/// logged and skipped.
#[instrument(name = "snapshot_load", skip(source), fields(source = %source.name()))]
pub async fn load_snapshot<S: SnapshotSource>(source: &mut S) -> Option<Vec<Entity>> {
    let started = Instant::now();
    match source.fetch().await {
        Ok(records) => {
            let entities = accept_valid(records);
            let elapsed = started.elapsed();
            metrics::histogram!("fleetview_snapshot_fetch_seconds").record(elapsed.as_secs_f64());
            metrics::gauge!("fleetview_snapshot_entities").set(entities.len() as f64);
            info!(
                entities = entities.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "snapshot fetched"
            );
            Some(entities)
        }
        Err(e) => {
            metrics::counter!("fleetview_snapshot_failures_total").increment(1);
            warn!(error = %e, "snapshot fetch failed, keeping current state");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn file_source_reads_api_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 1, "plate_number": "NB-1001", "status": "running", "current_lat": 6.93, "current_lng": 79.85}},
               {{"id": 2, "plate_number": "NB-1002", "status": "idle"}}]"#
        )
        .unwrap();

        let mut source = FileSnapshotSource::new(file.path());
        let entities = load_snapshot(&mut source).await.unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id, "1");
        assert!(entities[1].position().is_none());
    }

    #[tokio::test]
    async fn invalid_records_are_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 1, "plate_number": "NB-1001", "current_lat": 120.0, "current_lng": 500.0, "speed": -30.0}},
               {{"id": 2, "plate_number": "NB-1002", "current_lat": 6.93, "current_lng": 79.85, "speed": 25.0}},
               {{"id": 3, "plate_number": "NB-1003", "speed": -1.0}}]"#
        )
        .unwrap();

        let mut source = FileSnapshotSource::new(file.path());
        let entities = load_snapshot(&mut source).await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, "2");
    }

    #[tokio::test]
    async fn missing_file_yields_none() {
        let mut source = FileSnapshotSource::new("/nonexistent/buses.json");
        assert!(load_snapshot(&mut source).await.is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_a_fetch_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"buses\": 3}}").unwrap();
        let mut source = FileSnapshotSource::new(file.path());
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, ContractError::SnapshotFetch { .. }));
    }

    #[tokio::test]
    async fn static_source_returns_its_list() {
        let mut source = StaticSnapshotSource::new(vec![Entity::new("a"), Entity::new("b")]);
        assert_eq!(load_snapshot(&mut source).await.unwrap().len(), 2);
    }
}
