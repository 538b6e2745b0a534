//! Countdown driven by real tokio polls on a paused clock
//!
//! These run the countdown the way the application does: polls arrive as
//! `Event::CountdownPoll` from `TokioPollScheduler`, and time only moves
//! when the runtime auto-advances.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use memo_lib::countdown::{
    Countdown, CountdownObserver, CountdownState, PollOutcome, TokioClock, TokioPollScheduler,
};
use memo_lib::state_machine::Event;

#[derive(Debug, Clone, PartialEq)]
enum Note {
    Update(Duration),
    Finish,
}

#[derive(Default)]
struct Notes(Mutex<Vec<Note>>);

impl Notes {
    fn all(&self) -> Vec<Note> {
        self.0.lock().unwrap().clone()
    }
}

impl CountdownObserver for Notes {
    fn countdown_did_update(&self, remaining: Duration) {
        self.0.lock().unwrap().push(Note::Update(remaining));
    }
    fn countdown_did_finish(&self) {
        self.0.lock().unwrap().push(Note::Finish);
    }
}

fn setup(duration: Duration) -> (Countdown<TokioClock>, mpsc::Receiver<Event>, Arc<Notes>) {
    let (tx, rx) = mpsc::channel(16);
    let mut countdown = Countdown::with_clock(TokioPollScheduler::new(tx), TokioClock);
    countdown.set_duration(duration);
    let notes = Arc::new(Notes::default());
    countdown.set_observer(&notes);
    (countdown, rx, notes)
}

/// Feed polls into the countdown until `until`.
async fn drive(
    countdown: &mut Countdown<TokioClock>,
    rx: &mut mpsc::Receiver<Event>,
    until: Instant,
) -> Vec<PollOutcome> {
    let mut outcomes = Vec::new();
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(until) => break,
            Some(event) = rx.recv() => {
                if let Event::CountdownPoll { epoch } = event {
                    outcomes.push(countdown.poll(epoch));
                }
            }
        }
    }
    outcomes
}

fn finished_count(outcomes: &[PollOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|o| matches!(o, PollOutcome::Finished))
        .count()
}

#[tokio::test(start_paused = true)]
async fn two_second_countdown_ticks_then_finishes_exactly_once() {
    let (mut countdown, mut rx, notes) = setup(Duration::from_secs(2));
    let t0 = Instant::now();
    countdown.start();

    let outcomes = drive(&mut countdown, &mut rx, t0 + Duration::from_secs(3)).await;

    assert_eq!(finished_count(&outcomes), 1);
    let finish_at = outcomes
        .iter()
        .position(|o| matches!(o, PollOutcome::Finished))
        .unwrap();
    assert!(outcomes[finish_at + 1..]
        .iter()
        .all(|o| matches!(o, PollOutcome::Stale)));

    let ticks: Vec<Duration> = outcomes[..finish_at]
        .iter()
        .map(|o| match o {
            PollOutcome::Ticked(remaining) => *remaining,
            other => panic!("unexpected {:?} before finish", other),
        })
        .collect();
    assert!(ticks.len() >= 60, "expected ~66 ticks, got {}", ticks.len());
    assert!(ticks.windows(2).all(|w| w[1] <= w[0]));
    assert!(ticks[0] <= Duration::from_millis(1970));

    let all = notes.all();
    assert_eq!(all.last(), Some(&Note::Finish));
    assert_eq!(all.iter().filter(|n| **n == Note::Finish).count(), 1);
    assert_eq!(countdown.state(), CountdownState::Finished);
    assert!(!countdown.is_polling());
}

#[tokio::test(start_paused = true)]
async fn paused_countdown_stays_silent_past_its_deadline() {
    let (mut countdown, mut rx, notes) = setup(Duration::from_secs(30));
    let t0 = Instant::now();
    countdown.start();

    drive(&mut countdown, &mut rx, t0 + Duration::from_secs(5)).await;
    countdown.pause();
    let before = notes.all().len();

    let outcomes = drive(&mut countdown, &mut rx, t0 + Duration::from_secs(40)).await;
    assert!(outcomes.iter().all(|o| matches!(o, PollOutcome::Stale)));
    assert_eq!(notes.all().len(), before);
    assert_eq!(countdown.state(), CountdownState::Started);

    // Starting again re-arms with a fresh deadline.
    countdown.start();
    let outcomes = drive(&mut countdown, &mut rx, t0 + Duration::from_secs(71)).await;
    assert_eq!(finished_count(&outcomes), 1);
}

#[tokio::test(start_paused = true)]
async fn restart_supersedes_previous_epoch() {
    let (mut countdown, mut rx, notes) = setup(Duration::from_secs(2));
    let t0 = Instant::now();
    countdown.start();
    drive(&mut countdown, &mut rx, t0 + Duration::from_secs(1)).await;

    countdown.start();
    // The first epoch's deadline (t0 + 2s) passes without a finish.
    let outcomes = drive(&mut countdown, &mut rx, t0 + Duration::from_millis(2_500)).await;
    assert_eq!(finished_count(&outcomes), 0);
    assert!(!notes.all().contains(&Note::Finish));

    let outcomes = drive(&mut countdown, &mut rx, t0 + Duration::from_millis(3_500)).await;
    assert_eq!(finished_count(&outcomes), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_stops_all_notifications() {
    let (mut countdown, mut rx, notes) = setup(Duration::from_secs(1));
    let t0 = Instant::now();
    countdown.start();
    drive(&mut countdown, &mut rx, t0 + Duration::from_millis(300)).await;

    countdown.reset();
    countdown.reset();
    let before = notes.all().len();
    let outcomes = drive(&mut countdown, &mut rx, t0 + Duration::from_secs(3)).await;

    assert!(outcomes.iter().all(|o| matches!(o, PollOutcome::Stale)));
    assert_eq!(notes.all().len(), before);
    assert_eq!(countdown.state(), CountdownState::Reset);
    assert_eq!(countdown.remaining(), chrono::TimeDelta::zero());
}
