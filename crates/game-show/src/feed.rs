//! Frame feed service.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use event_bus::EventBus;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::error::AppError;
use crate::events::{Frame, VideoFrameEvent};

/// Where frames come from.
#[derive(Debug, Clone)]
pub enum FrameSource {
    /// Files of a directory, in name order, cycling.
    Directory { dir: PathBuf, files: Vec<PathBuf> },
    /// Zero-filled buffers of a fixed size.
    Synthetic { size: usize },
}

impl FrameSource {
    /// Lists the files of `dir` in name order.
    pub async fn directory(dir: PathBuf) -> Result<Self, AppError> {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }

        if files.is_empty() {
            return Err(AppError::EmptyFrameDir(dir));
        }
        files.sort();
        Ok(Self::Directory { dir, files })
    }
}

/// Publishes one [`VideoFrameEvent`] per tick, awaiting each publish before
/// loading the next frame.
pub struct FrameFeed {
    bus: EventBus,
    source: FrameSource,
    interval: Duration,
    limit: Option<u64>,
    sequence: u64,
}

impl FrameFeed {
    pub fn new(bus: EventBus, source: FrameSource, interval: Duration) -> Self {
        Self {
            bus,
            source,
            interval,
            limit: None,
            sequence: 0,
        }
    }

    /// Builds a feed from `FRAME_*` settings.
    pub async fn from_config(bus: EventBus, config: &Config) -> Result<Self, AppError> {
        let source = match &config.frame_dir {
            Some(dir) => FrameSource::directory(dir.clone()).await?,
            None => FrameSource::Synthetic {
                size: config.frame_size,
            },
        };

        Ok(Self::new(bus, source, config.frame_interval).with_limit(config.frame_limit))
    }

    /// Stops the feed after `limit` frames.
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Loads the next frame. The sequence advances even if loading fails.
    pub async fn next_frame(&mut self) -> Result<Frame, AppError> {
        let sequence = self.sequence;
        self.sequence += 1;

        match &self.source {
            FrameSource::Directory { dir, files } => {
                let path = sequence
                    .checked_rem(files.len() as u64)
                    .and_then(|index| files.get(index as usize))
                    .ok_or_else(|| AppError::EmptyFrameDir(dir.clone()))?;
                let data = tokio::fs::read(path).await?;
                Ok(Frame {
                    sequence,
                    source: path.display().to_string(),
                    data,
                })
            }
            FrameSource::Synthetic { size } => Ok(Frame {
                sequence,
                source: "synthetic".to_string(),
                data: vec![0u8; *size],
            }),
        }
    }

    /// Runs until `shutdown` resolves or the frame limit is reached.
    ///
    /// Returns the number of frames published. A frame that fails to load is
    /// logged and skipped.
    #[tracing::instrument(skip_all)]
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut published = 0;
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            limit = ?self.limit,
            "frame feed started"
        );

        loop {
            if self.limit.is_some_and(|limit| published >= limit) {
                tracing::info!(published, "frame limit reached");
                break;
            }

            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(published, "frame feed stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.next_frame().await {
                        Ok(frame) => {
                            self.bus.publish(VideoFrameEvent::new(frame)).await;
                            metrics::counter!("feed_frames_published_total").increment(1);
                            published += 1;
                        }
                        Err(error) => {
                            metrics::counter!("feed_frame_errors_total").increment(1);
                            tracing::error!(%error, "error loading frame");
                        }
                    }
                }
            }
        }

        published
    }
}
