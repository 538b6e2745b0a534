//! Repeating poll sources for the countdown
//!
//! A poll is identified by an epoch id. Every `start()` arms a fresh epoch and
//! cancels the previous one, and the countdown drops polls whose epoch is not
//! the one it currently holds.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::state_machine::Event;

/// Poll period used unless configured otherwise. Short enough for a smooth
/// sub-second display.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(30);

/// Exclusive handle to one armed poll.
#[derive(Debug)]
pub struct PollHandle {
    epoch: Uuid,
    cancel: CancellationToken,
}

impl PollHandle {
    pub fn new(epoch: Uuid, cancel: CancellationToken) -> Self {
        Self { epoch, cancel }
    }

    pub fn epoch(&self) -> Uuid {
        self.epoch
    }

    /// Stop the poll source. Consumes the handle so it cannot be reused.
    pub fn cancel(self) {
        self.cancel.cancel();
    }
}

/// Arms repeating polls on some host event loop.
pub trait PollScheduler: Send + Sync {
    fn arm(&self, epoch: Uuid, period: Duration) -> PollHandle;
}

/// Poll source that feeds `Event::CountdownPoll` into the application's
/// event channel from a tokio interval task.
pub struct TokioPollScheduler {
    tx: mpsc::Sender<Event>,
}

impl TokioPollScheduler {
    pub fn new(tx: mpsc::Sender<Event>) -> Arc<Self> {
        Arc::new(Self { tx })
    }
}

impl PollScheduler for TokioPollScheduler {
    fn arm(&self, epoch: Uuid, period: Duration) -> PollHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the first poll is one period after arming.
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        log::trace!("Poll {} cancelled", epoch);
                        break;
                    }
                    _ = interval.tick() => {
                        if tx.send(Event::CountdownPoll { epoch }).await.is_err() {
                            log::debug!("Poll {} stopping - channel closed", epoch);
                            break;
                        }
                    }
                }
            }
        });

        PollHandle::new(epoch, token)
    }
}

#[derive(Debug)]
struct ArmedPoll {
    epoch: Uuid,
    period: Duration,
    token: CancellationToken,
}

/// Poll source that never fires on its own. Tests fire polls by calling
/// `Countdown::poll` with an epoch read back from here.
#[derive(Debug, Clone, Default)]
pub struct ManualPollScheduler {
    armed: Arc<Mutex<Vec<ArmedPoll>>>,
}

impl ManualPollScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every epoch armed so far, oldest first.
    pub fn armed_epochs(&self) -> Vec<Uuid> {
        self.lock().iter().map(|p| p.epoch).collect()
    }

    /// Epochs whose handle has not been cancelled.
    pub fn live_epochs(&self) -> Vec<Uuid> {
        self.lock()
            .iter()
            .filter(|p| !p.token.is_cancelled())
            .map(|p| p.epoch)
            .collect()
    }

    pub fn last_epoch(&self) -> Option<Uuid> {
        self.lock().last().map(|p| p.epoch)
    }

    pub fn last_period(&self) -> Option<Duration> {
        self.lock().last().map(|p| p.period)
    }

    pub fn is_cancelled(&self, epoch: Uuid) -> bool {
        self.lock()
            .iter()
            .find(|p| p.epoch == epoch)
            .map(|p| p.token.is_cancelled())
            .unwrap_or(true)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ArmedPoll>> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PollScheduler for ManualPollScheduler {
    fn arm(&self, epoch: Uuid, period: Duration) -> PollHandle {
        let token = CancellationToken::new();
        self.lock().push(ArmedPoll {
            epoch,
            period,
            token: token.clone(),
        });
        PollHandle::new(epoch, token)
    }
}
