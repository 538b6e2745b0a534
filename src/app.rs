//! The state loop: owns the workflow state and the countdown, applies
//! effects, and renders the screen.

use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::countdown::{Clock, Countdown, CountdownState, PollOutcome};
use crate::display::{label_text, TimeLabel};
use crate::effects::EffectRunner;
use crate::state_machine::{reduce, Alert, ControlsView, Effect, Event, State};

/// Snapshot of what the screen shows.
/// Serialized as `{ "status": "recording", "timeLabel": "00:27", ... }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub status: &'static str,
    pub time_label: String,
    pub countdown: CountdownState,
    pub controls: ControlsView,
    pub alert: Option<Alert>,
}

pub struct App<C: Clock> {
    state: State,
    countdown: Countdown<C>,
    label: Arc<TimeLabel>,
    runner: Arc<dyn EffectRunner>,
    tx: mpsc::Sender<Event>,
    alert: Option<Alert>,
}

impl<C: Clock> App<C> {
    /// Wire the label up as the countdown's observer.
    pub fn new(
        mut countdown: Countdown<C>,
        label: Arc<TimeLabel>,
        runner: Arc<dyn EffectRunner>,
        tx: mpsc::Sender<Event>,
    ) -> Self {
        countdown.set_observer(&label);
        label.set_text(label_text(&countdown));
        Self {
            state: State::default(),
            countdown,
            label,
            runner,
            tx,
            alert: None,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn countdown(&self) -> &Countdown<C> {
        &self.countdown
    }

    pub fn label(&self) -> &TimeLabel {
        &self.label
    }

    pub fn last_alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    /// Show an alert outside of a transition (e.g. a setup failure).
    pub fn present_alert(&mut self, alert: Alert) {
        log::warn!("Alert: {} - {}", alert.title, alert.message);
        self.alert = Some(alert);
    }

    pub fn ui_state(&self) -> UiState {
        UiState {
            status: self.state.name(),
            time_label: label_text(&self.countdown),
            countdown: self.countdown.state(),
            controls: ControlsView::from_state(&self.state),
            alert: self.alert.clone(),
        }
    }

    /// Handle one event. Breaks when the loop should stop.
    pub fn handle(&mut self, event: Event) -> ControlFlow<()> {
        // Handle Exit and polls at the edge
        match event {
            Event::Exit => {
                log::info!("Exit requested, shutting down state loop");
                return ControlFlow::Break(());
            }
            Event::CountdownPoll { epoch } => {
                match self.countdown.poll(epoch) {
                    PollOutcome::Stale => {}
                    PollOutcome::Ticked(_) => self.emit_ui(false),
                    PollOutcome::Finished => self.emit_ui(true),
                }
                return ControlFlow::Continue(());
            }
            _ => {}
        }

        log::debug!("Received event: {:?}", event);
        let old_discriminant = std::mem::discriminant(&self.state);
        let (next, effects) = reduce(&self.state, event);
        if old_discriminant != std::mem::discriminant(&next) {
            log::info!("State transition: {:?} -> {:?}", self.state, next);
        }
        self.state = next;

        for effect in effects {
            self.apply(effect);
        }
        ControlFlow::Continue(())
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::StartCountdown => self.countdown.start(),
            Effect::PauseCountdown => self.countdown.pause(),
            Effect::ResetCountdown => self.countdown.reset(),
            Effect::ShowAlert(alert) => self.present_alert(alert),
            Effect::EmitUi => self.emit_ui(true),
            other => self.runner.spawn(other, self.tx.clone()),
        }
    }

    /// Re-render the screen. Per-poll renders are only logged at trace level.
    fn emit_ui(&self, loud: bool) {
        let ui = self.ui_state();
        self.label.set_text(ui.time_label.clone());
        if loud {
            log::debug!("Emitting UI state: {:?}", serde_json::to_string(&ui));
        } else {
            log::trace!("Emitting UI state: {:?}", serde_json::to_string(&ui));
        }
    }
}

/// Run the main state loop until `Exit` or until every sender is gone.
pub async fn run_state_loop<C: Clock>(mut app: App<C>, mut rx: mpsc::Receiver<Event>) {
    app.emit_ui(true);
    log::info!("State loop started");

    while let Some(event) = rx.recv().await {
        if app.handle(event).is_break() {
            break;
        }
    }

    app.countdown.reset();
    log::info!("State loop ended");
}
