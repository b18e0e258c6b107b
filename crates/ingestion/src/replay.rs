//! Replay channel - plays back a recorded realtime stream
//!
//! Reads a JSON-lines file where each line is one raw channel message, and
//! delivers the lines in file order at a fixed rate. A full ingestion queue
//! holds playback back; no recorded line is dropped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{ChannelCallback, ChannelSignal, RealtimeChannel};
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};

/// Replay configuration
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    /// Messages per second; `None` delivers as fast as the consumer allows
    pub rate_hz: Option<f64>,

    /// Restart from the first line after the last one
    pub loop_playback: bool,
}

/// Replay channel
pub struct ReplayChannel {
    channel_id: String,
    path: PathBuf,
    lines: Arc<Vec<String>>,
    config: ReplayConfig,
    subscribed: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayChannel {
    /// Load a recording
    ///
    /// Blank lines and lines starting with `#` are skipped. Message content
    /// is not checked here; undecodable lines are counted downstream.
    pub fn open(channel_id: impl Into<String>, path: &Path, config: ReplayConfig) -> Result<Self> {
        let channel_id = channel_id.into();
        let open_err = |source| IngestionError::ReplayOpen {
            path: path.to_path_buf(),
            source,
        };

        let reader = BufReader::new(File::open(path).map_err(open_err)?);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(open_err)?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            lines.push(trimmed.to_string());
        }

        info!(
            channel_id = %channel_id,
            path = %path.display(),
            messages = lines.len(),
            "loaded replay recording"
        );

        Ok(Self {
            channel_id,
            path: path.to_path_buf(),
            lines: Arc::new(lines),
            config,
            subscribed: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn message_count(&self) -> usize {
        self.lines.len()
    }
}

impl RealtimeChannel for ReplayChannel {
    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn subscribe(&self, callback: ChannelCallback) {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return;
        }

        let subscribed = self.subscribed.clone();
        let channel_id = self.channel_id.clone();
        let lines = self.lines.clone();
        let interval = self
            .config
            .rate_hz
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .map(|rate| Duration::from_secs_f64(1.0 / rate));
        let loop_playback = self.config.loop_playback;

        let handle = thread::spawn(move || {
            debug!(channel_id = %channel_id, "replay thread started");
            callback(ChannelSignal::Connected);

            'playback: loop {
                if lines.is_empty() {
                    warn!(channel_id = %channel_id, "no messages to replay");
                    break;
                }

                for line in lines.iter() {
                    if !subscribed.load(Ordering::Relaxed) {
                        debug!(channel_id = %channel_id, "replay stopped");
                        break 'playback;
                    }
                    callback(ChannelSignal::Message(line.clone()));
                    if let Some(interval) = interval {
                        thread::sleep(interval);
                    }
                }

                if !loop_playback {
                    info!(channel_id = %channel_id, "replay completed");
                    break;
                }
                debug!(channel_id = %channel_id, "looping replay");
            }

            callback(ChannelSignal::Disconnected);
            subscribed.store(false, Ordering::SeqCst);
        });

        if let Ok(mut slot) = self.thread_handle.lock() {
            *slot = Some(handle);
        }
    }

    fn stop(&self) {
        self.subscribed.store(false, Ordering::SeqCst);

        let handle = self
            .thread_handle
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Relaxed)
    }

    fn waits_for_consumer(&self) -> bool {
        true
    }
}
