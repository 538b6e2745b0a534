//! Effect runner for the memo recorder
//!
//! Executes the audio effects produced by the state machine. Completion
//! events are sent back through the event channel. The capture and playback
//! engines are stand-ins: a take lasts until it is stopped or reaches the
//! bounded duration, and playback lasts as long as the recorded take.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audio::{ensure_memo_dir, AudioError, RecorderSettings};
use crate::state_machine::{Effect, Event};

/// Trait for running effects asynchronously.
/// Completion events are sent back via the provided channel.
pub trait EffectRunner: Send + Sync + 'static {
    fn spawn(&self, effect: Effect, tx: mpsc::Sender<Event>);
}

/// One take in progress. `segment` is set while the recorder is running.
#[derive(Debug, Default)]
struct Take {
    recorded: Duration,
    segment: Option<Segment>,
}

#[derive(Debug)]
struct Segment {
    started_at: Instant,
    cancel: CancellationToken,
}

impl Take {
    fn close_segment(&mut self) {
        if let Some(segment) = self.segment.take() {
            segment.cancel.cancel();
            self.recorded += segment.started_at.elapsed();
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    takes: HashMap<Uuid, Take>,
    playbacks: HashMap<Uuid, CancellationToken>,
    memo_length: Option<Duration>,
}

/// Effect runner backed by simulated audio engines.
pub struct SimulatedEffectRunner {
    memo_path: Result<PathBuf, AudioError>,
    recorder: RecorderSettings,
    max_duration: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedEffectRunner {
    pub fn new(
        memo_path: Result<PathBuf, AudioError>,
        recorder: RecorderSettings,
        max_duration: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            memo_path,
            recorder,
            max_duration,
            shared: Arc::new(Mutex::new(Shared::default())),
        })
    }
}

/// Finalize a take: close the running segment and write the memo file.
async fn finalize_take(
    shared: &Mutex<Shared>,
    id: Uuid,
    path: &Path,
) -> Result<Duration, AudioError> {
    let length = {
        let mut guard = shared.lock().await;
        let mut take = guard.takes.remove(&id).unwrap_or_default();
        take.close_segment();
        guard.memo_length = Some(take.recorded);
        take.recorded
    };

    let contents = format!("simulated memo {} ({} ms)\n", id, length.as_millis());
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| AudioError::WriteFailed(format!("{}: {}", path.display(), e)))?;
    Ok(length)
}

impl EffectRunner for SimulatedEffectRunner {
    fn spawn(&self, effect: Effect, tx: mpsc::Sender<Event>) {
        match effect {
            Effect::StartRecording { id } => {
                let path = match &self.memo_path {
                    Ok(path) => path.clone(),
                    Err(e) => {
                        let err = e.to_string();
                        log::error!("Failed to start recording: {}", err);
                        tokio::spawn(async move {
                            let _ = tx.send(Event::RecorderStartFail { id, err }).await;
                        });
                        return;
                    }
                };
                if let Err(e) = self.recorder.validate().and_then(|_| ensure_memo_dir(&path)) {
                    log::error!("Failed to prepare recorder: {}", e);
                    let err = e.to_string();
                    tokio::spawn(async move {
                        let _ = tx.send(Event::RecorderStartFail { id, err }).await;
                    });
                    return;
                }

                let shared = self.shared.clone();
                let max_duration = self.max_duration;
                let settings = self.recorder.clone();

                tokio::spawn(async move {
                    let cancel = CancellationToken::new();
                    {
                        let mut guard = shared.lock().await;
                        let take = guard.takes.entry(id).or_default();
                        // Starting again after a pause begins a fresh bounded take.
                        take.close_segment();
                        take.recorded = Duration::ZERO;
                        take.segment = Some(Segment {
                            started_at: Instant::now(),
                            cancel: cancel.clone(),
                        });
                    }
                    log::info!(
                        "Recording {} started: {:?} {} Hz x{} {:?} (metering {}) into {:?}, limit {:?}",
                        id,
                        settings.format,
                        settings.sample_rate_hz,
                        settings.channels,
                        settings.quality,
                        if settings.metering_enabled { "on" } else { "off" },
                        path,
                        max_duration
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            log::debug!("Recording {} segment closed early", id);
                        }
                        _ = tokio::time::sleep(max_duration) => {
                            let event = match finalize_take(&shared, id, &path).await {
                                Ok(length) => {
                                    log::info!("Recording {} reached limit after {:?}", id, length);
                                    Event::RecorderFinished { id, successfully: true }
                                }
                                Err(e) => {
                                    log::error!("Failed to finalize recording {}: {}", id, e);
                                    Event::RecorderFinished { id, successfully: false }
                                }
                            };
                            let _ = tx.send(event).await;
                        }
                    }
                });
            }

            Effect::PauseRecording { id } => {
                let shared = self.shared.clone();
                tokio::spawn(async move {
                    let mut guard = shared.lock().await;
                    match guard.takes.get_mut(&id) {
                        Some(take) => {
                            take.close_segment();
                            log::info!("Recording {} paused at {:?}", id, take.recorded);
                        }
                        None => log::warn!("PauseRecording: no active take for id={}", id),
                    }
                });
            }

            Effect::StopRecording { id } => {
                let shared = self.shared.clone();
                let path = self.memo_path.clone();
                tokio::spawn(async move {
                    let known = shared.lock().await.takes.contains_key(&id);
                    if !known {
                        log::warn!("StopRecording: no active take for id={}", id);
                        return;
                    }
                    let successfully = match path {
                        Ok(path) => match finalize_take(&shared, id, &path).await {
                            Ok(length) => {
                                log::info!("Recording {} stopped after {:?}", id, length);
                                true
                            }
                            Err(e) => {
                                log::error!("Failed to finalize recording {}: {}", id, e);
                                false
                            }
                        },
                        Err(e) => {
                            log::error!("Failed to stop recording {}: {}", id, e);
                            false
                        }
                    };
                    let _ = tx.send(Event::RecorderFinished { id, successfully }).await;
                });
            }

            Effect::StartPlayback {
                session_id,
                playback_id,
            } => {
                let shared = self.shared.clone();
                let path = self.memo_path.clone();
                let fallback = self.max_duration;
                tokio::spawn(async move {
                    let exists = match &path {
                        Ok(path) => tokio::fs::metadata(path).await.is_ok(),
                        Err(_) => false,
                    };
                    if !exists {
                        let err = AudioError::PlayerCreationFailed("memo file missing".to_string());
                        log::error!("Playback {} of {}: {}", playback_id, session_id, err);
                        let _ = tx
                            .send(Event::PlayerStartFail {
                                id: playback_id,
                                err: err.to_string(),
                            })
                            .await;
                        return;
                    }

                    let cancel = CancellationToken::new();
                    let length = {
                        let mut guard = shared.lock().await;
                        guard.playbacks.insert(playback_id, cancel.clone());
                        guard.memo_length.unwrap_or(fallback)
                    };
                    log::info!("Playback {} started ({:?})", playback_id, length);

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            log::debug!("Playback {} interrupted", playback_id);
                        }
                        _ = tokio::time::sleep(length) => {
                            shared.lock().await.playbacks.remove(&playback_id);
                            log::info!("Playback {} finished", playback_id);
                            let _ = tx
                                .send(Event::PlayerFinished { id: playback_id, successfully: true })
                                .await;
                        }
                    }
                });
            }

            Effect::PausePlayback { playback_id } | Effect::StopPlayback { playback_id } => {
                let shared = self.shared.clone();
                tokio::spawn(async move {
                    match shared.lock().await.playbacks.remove(&playback_id) {
                        Some(cancel) => {
                            cancel.cancel();
                            log::info!("Playback {} halted", playback_id);
                        }
                        None => log::debug!("No active playback for id={}", playback_id),
                    }
                });
            }

            other => {
                log::warn!("Effect {:?} is handled by the state loop", other);
            }
        }
    }
}
