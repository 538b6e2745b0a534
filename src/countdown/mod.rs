//! Countdown timer
//!
//! Tracks a deadline for one interval at a time and reports progress to a
//! single observer. The waiting is done by a repeating poll (see `poll`);
//! each poll either reports the remaining time or, once the deadline has
//! passed, reports completion and disarms itself.

mod clock;
mod poll;

pub use clock::{Clock, ManualClock, TokioClock};
pub use poll::{
    ManualPollScheduler, PollHandle, PollScheduler, TokioPollScheduler, DEFAULT_POLL_PERIOD,
};

use chrono::TimeDelta;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// About 136 years.
const FAR_FUTURE: Duration = Duration::from_secs(u32::MAX as u64);

/// Lifecycle of a countdown. Does not gate poll delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    #[default]
    Reset,
    Started,
    Finished,
}

/// Listener for countdown progress.
pub trait CountdownObserver: Send + Sync {
    fn countdown_did_update(&self, remaining: Duration);
    fn countdown_did_finish(&self);
}

/// What a single poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Epoch is not the armed one, or nothing is counting. Nothing happened.
    Stale,
    /// Deadline not reached; observer got the remaining time.
    Ticked(Duration),
    /// Deadline passed; observer got the finish notification.
    Finished,
}

/// Counts down from a fixed duration and reports to a weakly held observer.
pub struct Countdown<C: Clock> {
    duration: Duration,
    deadline: Option<Instant>,
    state: CountdownState,
    observer: Option<Weak<dyn CountdownObserver>>,
    poll: Option<PollHandle>,
    poll_period: Duration,
    scheduler: Arc<dyn PollScheduler>,
    clock: C,
}

impl<C: Clock> Countdown<C> {
    pub fn with_clock(scheduler: Arc<dyn PollScheduler>, clock: C) -> Self {
        Self {
            duration: Duration::ZERO,
            deadline: None,
            state: CountdownState::Reset,
            observer: None,
            poll: None,
            poll_period: DEFAULT_POLL_PERIOD,
            scheduler,
            clock,
        }
    }

    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Takes effect on the next `start()`; a running deadline is not moved.
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn poll_period(&self) -> Duration {
        self.poll_period
    }

    /// Whether a poll is currently armed.
    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    /// Register the listener. Only a weak reference is kept.
    pub fn set_observer<O: CountdownObserver + 'static>(&mut self, observer: &Arc<O>) {
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn CountdownObserver> = weak;
        self.observer = Some(weak);
    }

    /// Time left until the deadline, or zero when nothing is counting.
    ///
    /// Derived from the clock on every call, so it keeps moving while paused,
    /// and it can be briefly negative between the deadline and the next poll.
    pub fn remaining(&self) -> TimeDelta {
        match self.deadline {
            Some(deadline) => signed_delta(deadline, self.clock.now()),
            None => TimeDelta::zero(),
        }
    }

    /// Arm a new epoch from any state: cancel the current poll, compute the
    /// deadline from now and start polling.
    pub fn start(&mut self) {
        self.cancel_poll();
        let epoch = Uuid::new_v4();
        self.poll = Some(self.scheduler.arm(epoch, self.poll_period));
        self.deadline = Some(deadline_after(self.clock.now(), self.duration));
        self.state = CountdownState::Started;
        log::debug!(
            "Countdown started: epoch={}, duration={:?}",
            epoch,
            self.duration
        );
    }

    /// Stop polling but keep the deadline. State is left as it is.
    pub fn pause(&mut self) {
        self.cancel_poll();
    }

    /// Stop polling, forget the deadline and go back to `Reset`.
    pub fn reset(&mut self) {
        self.deadline = None;
        self.cancel_poll();
        self.state = CountdownState::Reset;
    }

    /// One poll tick. Polls from any epoch other than the armed one are ignored.
    pub fn poll(&mut self, epoch: Uuid) -> PollOutcome {
        if self.poll.as_ref().map(PollHandle::epoch) != Some(epoch) {
            log::trace!("Ignoring stale poll {}", epoch);
            return PollOutcome::Stale;
        }
        let Some(deadline) = self.deadline else {
            return PollOutcome::Stale;
        };

        let now = self.clock.now();
        if now <= deadline {
            let remaining = deadline - now;
            self.notify(|observer| observer.countdown_did_update(remaining));
            PollOutcome::Ticked(remaining)
        } else {
            // Disarm before notifying so no later poll of this epoch can finish again.
            self.state = CountdownState::Finished;
            self.cancel_poll();
            self.deadline = None;
            log::debug!("Countdown finished: epoch={}", epoch);
            self.notify(|observer| observer.countdown_did_finish());
            PollOutcome::Finished
        }
    }

    fn cancel_poll(&mut self) {
        if let Some(handle) = self.poll.take() {
            log::trace!("Cancelling poll {}", handle.epoch());
            handle.cancel();
        }
    }

    fn notify(&self, f: impl FnOnce(&dyn CountdownObserver)) {
        if let Some(observer) = self.observer.as_ref().and_then(Weak::upgrade) {
            f(observer.as_ref());
        }
    }
}

impl<C: Clock> Drop for Countdown<C> {
    fn drop(&mut self) {
        self.cancel_poll();
    }
}

impl<C: Clock> std::fmt::Debug for Countdown<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("duration", &self.duration)
            .field("deadline", &self.deadline)
            .field("state", &self.state)
            .field("poll", &self.poll.as_ref().map(PollHandle::epoch))
            .finish()
    }
}

/// Deadline for a run starting at `now`. Durations past what `Instant` can
/// hold are capped at `FAR_FUTURE`.
fn deadline_after(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn signed_delta(deadline: Instant, now: Instant) -> TimeDelta {
    if now <= deadline {
        TimeDelta::from_std(deadline - now).unwrap_or(TimeDelta::MAX)
    } else {
        -TimeDelta::from_std(now - deadline).unwrap_or(TimeDelta::MAX)
    }
}
