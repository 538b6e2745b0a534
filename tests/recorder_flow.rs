//! End-to-end recorder workflow with simulated audio engines
//!
//! Drives `App` from its event channel on a paused tokio clock, so a
//! thirty-second take completes instantly.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use memo_lib::app::App;
use memo_lib::audio::RecorderSettings;
use memo_lib::countdown::{Clock, Countdown, CountdownState, TokioClock, TokioPollScheduler};
use memo_lib::display::TimeLabel;
use memo_lib::effects::SimulatedEffectRunner;
use memo_lib::state_machine::{Alert, Event, State};

const TAKE: Duration = Duration::from_secs(30);

fn build(dir: &std::path::Path) -> (App<TokioClock>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(64);
    let mut countdown = Countdown::with_clock(TokioPollScheduler::new(tx.clone()), TokioClock);
    countdown.set_duration(TAKE);
    let runner = SimulatedEffectRunner::new(
        Ok(dir.join("MyAudioMemo.m4a")),
        RecorderSettings::default(),
        TAKE,
    );
    let app = App::new(countdown, Arc::new(TimeLabel::new("")), runner, tx);
    (app, rx)
}

async fn pump_until<C: Clock>(
    app: &mut App<C>,
    rx: &mut mpsc::Receiver<Event>,
    done: impl Fn(&App<C>) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(120), async {
        while !done(app) {
            let event = rx.recv().await.expect("event channel open");
            let _ = app.handle(event);
        }
    })
    .await
    .expect("condition reached in time");
}

async fn pump_for<C: Clock>(app: &mut App<C>, rx: &mut mpsc::Receiver<Event>, span: Duration) {
    let until = tokio::time::Instant::now() + span;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(until) => break,
            Some(event) = rx.recv() => { let _ = app.handle(event); }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn full_take_then_playback() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, mut rx) = build(dir.path());

    let _ = app.handle(Event::RecordPressed);
    assert!(matches!(app.state(), State::Recording { .. }));
    assert_eq!(app.ui_state().time_label, "00:30");

    pump_until(&mut app, &mut rx, |app| matches!(app.state(), State::Ready { .. })).await;
    assert_eq!(
        app.last_alert(),
        Some(&Alert::new(
            "Finish Recording",
            "Successfully recorded the audio!"
        ))
    );
    assert!(dir.path().join("MyAudioMemo.m4a").exists());
    assert!(app.ui_state().controls.play_enabled);

    pump_until(&mut app, &mut rx, |app| app.label().finish_count() == 1).await;
    assert_eq!(app.countdown().state(), CountdownState::Finished);
    assert_eq!(app.ui_state().time_label, "00:00");

    let _ = app.handle(Event::PlayPressed);
    assert!(matches!(app.state(), State::Playing { .. }));
    assert_eq!(app.ui_state().controls.play_title, "Stop");

    pump_until(&mut app, &mut rx, |app| matches!(app.state(), State::Ready { .. })).await;
    assert_eq!(
        app.last_alert(),
        Some(&Alert::new("Finish Playing", "Finish playing the recording!"))
    );
    assert_eq!(app.countdown().state(), CountdownState::Reset);
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_take_keeps_partial_memo() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, mut rx) = build(dir.path());

    let _ = app.handle(Event::RecordPressed);
    pump_for(&mut app, &mut rx, Duration::from_secs(4)).await;
    assert_eq!(app.ui_state().time_label, "00:26");

    let _ = app.handle(Event::CancelPressed);
    assert!(matches!(app.state(), State::Ready { .. }));
    assert_eq!(app.countdown().state(), CountdownState::Reset);
    assert_eq!(app.ui_state().time_label, "00:30");

    // Stopping the recorder reports completion like the bounded finish does.
    pump_until(&mut app, &mut rx, |app| app.last_alert().is_some()).await;
    assert_eq!(
        app.last_alert().map(|a| a.title.as_str()),
        Some("Finish Recording")
    );
    let memo = std::fs::read_to_string(dir.path().join("MyAudioMemo.m4a")).unwrap();
    assert!(memo.contains("4000 ms"));

    // Nothing else fires once the take is over.
    let label_finishes = app.label().finish_count();
    pump_for(&mut app, &mut rx, Duration::from_secs(60)).await;
    assert_eq!(app.label().finish_count(), label_finishes);
    assert!(matches!(app.state(), State::Ready { .. }));
}

#[tokio::test(start_paused = true)]
async fn pausing_playback_freezes_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let (mut app, mut rx) = build(dir.path());

    let _ = app.handle(Event::RecordPressed);
    pump_for(&mut app, &mut rx, Duration::from_secs(2)).await;
    let _ = app.handle(Event::CancelPressed);
    pump_until(&mut app, &mut rx, |app| app.last_alert().is_some()).await;

    let _ = app.handle(Event::PlayPressed);
    pump_for(&mut app, &mut rx, Duration::from_millis(500)).await;
    let _ = app.handle(Event::PlayPressed);
    assert!(matches!(app.state(), State::Ready { .. }));
    assert!(!app.countdown().is_polling());

    let updates = app.label().update_count();
    pump_for(&mut app, &mut rx, Duration::from_secs(40)).await;
    assert_eq!(app.label().update_count(), updates);
    assert_eq!(app.label().finish_count(), 0);
}
