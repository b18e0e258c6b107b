//! FileSink - appends view frames to a JSON-lines file

use chrono::{SecondsFormat, Utc};
use contracts::{ContractError, ViewFrame, ViewSink};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Build from sink params (`path`, optional `append`)
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| ContractError::config_validation("params.path", "file sink requires a path"))?;
        let append = params
            .get("append")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Ok(Self { path, append })
    }
}

/// One output line
#[derive(Serialize)]
struct FrameRecord<'a> {
    /// Wall-clock write time, RFC 3339
    written_at: String,
    #[serde(flatten)]
    frame: &'a ViewFrame,
}

/// Sink that writes one JSON object per frame
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: BufWriter<File>,
    lines: u64,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let name = name.into();
        let config = FileSinkConfig::from_params(params)?;
        Self::new(name.clone(), config).map_err(|e| ContractError::sink_write(name, e.to_string()))
    }

    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    fn append_frame(&mut self, frame: &ViewFrame) -> std::io::Result<()> {
        let record = FrameRecord {
            written_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            frame,
        };
        serde_json::to_writer(&mut self.writer, &record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn persist_frame(&mut self, frame: &ViewFrame) -> Result<(), ContractError> {
        self.append_frame(frame).map_err(|e| {
            error!(sink = %self.name, seq = frame.seq, error = %e, "write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl ViewSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, frame),
        fields(sink = %self.name, seq = frame.seq)
    )]
    async fn write(&mut self, frame: &ViewFrame) -> Result<(), ContractError> {
        self.persist_frame(frame)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        debug!(sink = %self.name, lines = self.lines, "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{LinkState, ViewPayload};
    use tempfile::tempdir;

    fn frame(seq: u64) -> ViewFrame {
        ViewFrame {
            seq,
            payload: ViewPayload::Link {
                state: LinkState::Receiving,
            },
        }
    }

    #[tokio::test]
    async fn writes_one_line_per_frame() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            path: dir.path().join("out").join("frames.jsonl"),
            append: false,
        };

        let mut sink = FileSink::new("test_file", config).unwrap();
        sink.write(&frame(0)).await.unwrap();
        sink.write(&frame(1)).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(sink.lines_written(), 2);

        let text = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["seq"], 1);
        assert_eq!(value["payload"]["kind"], "link");
        assert_eq!(value["payload"]["state"], "receiving");
        assert!(value["written_at"].is_string());
    }

    #[tokio::test]
    async fn append_keeps_existing_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frames.jsonl");
        fs::write(&path, "{}\n").unwrap();

        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        params.insert("append".to_string(), "true".to_string());

        let mut sink = FileSink::from_params("appender", &params).unwrap();
        sink.write(&frame(7)).await.unwrap();
        sink.close().await.unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn missing_path_param_is_rejected() {
        assert!(FileSinkConfig::from_params(&HashMap::new()).is_err());
    }
}
