//! LogSink - logs frame summaries via tracing

use contracts::{ContractError, ViewFrame, ViewPayload, ViewSink};
use tracing::{info, instrument, warn};

/// Sink that logs one line per view frame
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_frame_summary(&self, frame: &ViewFrame) {
        match &frame.payload {
            ViewPayload::Full(view) => info!(
                sink = %self.name,
                seq = frame.seq,
                total = view.stats.total,
                running = view.stats.running,
                cards = view.cards.len(),
                routes = view.stats.routes,
                "full view"
            ),
            ViewPayload::EntityPatch(patch) => info!(
                sink = %self.name,
                seq = frame.seq,
                entity_id = %patch.card.id,
                status = patch.card.status.as_ref().map(|s| s.as_str()).unwrap_or("unset"),
                speed = patch.card.speed,
                location = patch.card.location.as_deref().unwrap_or("-"),
                visible = patch.visible,
                "entity patch"
            ),
            ViewPayload::Panel { panel } => info!(
                sink = %self.name,
                seq = frame.seq,
                focused = panel.as_ref().map(|p| p.id.as_str()).unwrap_or("none"),
                "panel"
            ),
            ViewPayload::Alert(alert) => warn!(
                sink = %self.name,
                seq = frame.seq,
                category = %alert.category,
                message = %alert.message,
                "alert"
            ),
            ViewPayload::Link { state } => info!(
                sink = %self.name,
                seq = frame.seq,
                state = %state,
                "link"
            ),
        }
    }
}

impl ViewSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, seq = frame.seq)
    )]
    async fn write(&mut self, frame: &ViewFrame) -> Result<(), ContractError> {
        self.log_frame_summary(frame);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Alert, FullView};

    #[tokio::test]
    async fn writes_every_payload_kind() {
        let mut sink = LogSink::new("test_log");
        let payloads = vec![
            ViewPayload::Full(FullView::default()),
            ViewPayload::Panel { panel: None },
            ViewPayload::Alert(Alert {
                category: "delay".into(),
                message: "late".into(),
                entity_id: None,
            }),
        ];
        for (seq, payload) in payloads.into_iter().enumerate() {
            let frame = ViewFrame {
                seq: seq as u64,
                payload,
            };
            assert!(sink.write(&frame).await.is_ok());
        }
        assert!(sink.close().await.is_ok());
    }

    #[test]
    fn name_is_kept() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
