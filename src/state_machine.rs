//! State machine for the memo recorder screen
//!
//! Single-writer pattern: every transition goes through `reduce()`, which
//! returns the next state plus the effects to run. Countdown effects and UI
//! effects are applied by the state loop; audio effects go to the effect runner.

use serde::Serialize;
use uuid::Uuid;

/// Workflow state. `session_id` names one take of the memo and
/// `playback_id` one playback run; events carrying other ids are stale.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum State {
    /// Nothing recorded yet.
    #[default]
    Idle,
    Recording {
        session_id: Uuid,
    },
    /// Recorder paused by a second press on Record. The countdown keeps running.
    RecordingPaused {
        session_id: Uuid,
    },
    /// A memo exists and can be played back.
    Ready {
        session_id: Uuid,
    },
    Playing {
        session_id: Uuid,
        playback_id: Uuid,
    },
    Error {
        message: String,
    },
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Recording { .. } => "recording",
            State::RecordingPaused { .. } => "recordingPaused",
            State::Ready { .. } => "ready",
            State::Playing { .. } => "playing",
            State::Error { .. } => "error",
        }
    }
}

/// Events from the buttons, the audio services and the countdown poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RecordPressed,
    PlayPressed,
    CancelPressed,
    /// Application exit requested
    Exit,

    // Recorder events
    RecorderStartFail {
        id: Uuid,
        err: String,
    },
    RecorderFinished {
        id: Uuid,
        successfully: bool,
    },

    // Player events
    PlayerStartFail {
        id: Uuid,
        err: String,
    },
    PlayerFinished {
        id: Uuid,
        successfully: bool,
    },

    /// Countdown poll tick. Handled by the state loop, not the reducer.
    CountdownPoll {
        epoch: Uuid,
    },
}

/// A message box shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }
}

/// Effects to be executed after a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Record into the memo file, bounded by the configured duration.
    StartRecording {
        id: Uuid,
    },
    PauseRecording {
        id: Uuid,
    },
    StopRecording {
        id: Uuid,
    },
    StartPlayback {
        session_id: Uuid,
        playback_id: Uuid,
    },
    PausePlayback {
        playback_id: Uuid,
    },
    StopPlayback {
        playback_id: Uuid,
    },
    StartCountdown,
    PauseCountdown,
    ResetCountdown,
    ShowAlert(Alert),
    /// Signal to re-render the screen
    EmitUi,
}

fn recording_finished_alert() -> Alert {
    Alert::new("Finish Recording", "Successfully recorded the audio!")
}

fn playing_finished_alert() -> Alert {
    Alert::new("Finish Playing", "Finish playing the recording!")
}

fn begin_recording(session_id: Uuid) -> (State, Vec<Effect>) {
    (
        State::Recording { session_id },
        vec![
            Effect::StartRecording { id: session_id },
            Effect::StartCountdown,
            Effect::EmitUi,
        ],
    )
}

/// Reducer function: (state, event) -> (next_state, effects)
///
/// Key rules:
/// - Never mutate state directly
/// - Ignore events with stale session or playback ids
/// - Always emit EmitUi after state changes
pub fn reduce(state: &State, event: Event) -> (State, Vec<Effect>) {
    use Effect::*;
    use Event::*;
    use State::*;

    match (state, event) {
        // -----------------
        // Record button
        // -----------------
        (Idle | Ready { .. } | Error { .. }, RecordPressed) => begin_recording(Uuid::new_v4()),
        (Playing { playback_id, .. }, RecordPressed) => {
            let (next, mut effects) = begin_recording(Uuid::new_v4());
            // Stop the player before recording
            effects.insert(
                0,
                StopPlayback {
                    playback_id: *playback_id,
                },
            );
            (next, effects)
        }
        // Pause only the recorder; the countdown keeps running.
        (Recording { session_id }, RecordPressed) => (
            RecordingPaused {
                session_id: *session_id,
            },
            vec![PauseRecording { id: *session_id }, EmitUi],
        ),
        (RecordingPaused { session_id }, RecordPressed) => begin_recording(*session_id),

        // -----------------
        // Cancel button: stop the take and allow playback
        // -----------------
        (Recording { session_id } | RecordingPaused { session_id }, CancelPressed) => (
            Ready {
                session_id: *session_id,
            },
            vec![
                StopRecording { id: *session_id },
                ResetCountdown,
                EmitUi,
            ],
        ),
        (Error { .. }, CancelPressed) => (Idle, vec![EmitUi]),

        // -----------------
        // Recorder completion
        // -----------------
        (
            Recording { session_id } | RecordingPaused { session_id } | Ready { session_id },
            RecorderFinished { id, successfully },
        ) if *session_id == id => {
            if successfully {
                (
                    Ready { session_id: id },
                    vec![ShowAlert(recording_finished_alert()), EmitUi],
                )
            } else {
                log::warn!("Recording {} did not finish successfully", id);
                (
                    Ready { session_id: id },
                    vec![ResetCountdown, EmitUi],
                )
            }
        }
        (Recording { session_id } | RecordingPaused { session_id }, RecorderStartFail { id, err })
            if *session_id == id =>
        {
            (
                Error {
                    message: err.clone(),
                },
                vec![ResetCountdown, ShowAlert(Alert::error(err)), EmitUi],
            )
        }

        // -----------------
        // Play button
        // -----------------
        (Ready { session_id }, PlayPressed) => {
            let playback_id = Uuid::new_v4();
            (
                Playing {
                    session_id: *session_id,
                    playback_id,
                },
                vec![
                    StartPlayback {
                        session_id: *session_id,
                        playback_id,
                    },
                    StartCountdown,
                    EmitUi,
                ],
            )
        }
        (
            Playing {
                session_id,
                playback_id,
            },
            PlayPressed,
        ) => (
            Ready {
                session_id: *session_id,
            },
            vec![
                PausePlayback {
                    playback_id: *playback_id,
                },
                PauseCountdown,
                EmitUi,
            ],
        ),

        // -----------------
        // Player completion
        // -----------------
        (
            Playing {
                session_id,
                playback_id,
            },
            PlayerFinished { id, .. },
        ) if *playback_id == id => (
            Ready {
                session_id: *session_id,
            },
            vec![ResetCountdown, ShowAlert(playing_finished_alert()), EmitUi],
        ),
        (
            Playing {
                session_id,
                playback_id,
            },
            PlayerStartFail { id, err },
        ) if *playback_id == id => (
            Ready {
                session_id: *session_id,
            },
            vec![
                ResetCountdown,
                ShowAlert(Alert::error(format!("Failed to initialize audio player: {}", err))),
                EmitUi,
            ],
        ),

        // -----------------
        // Disabled buttons, stale events and polls: no transition
        // -----------------
        _ => (state.clone(), vec![]),
    }
}

/// Button state derived from the workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlsView {
    pub record_enabled: bool,
    pub cancel_enabled: bool,
    pub play_enabled: bool,
    pub play_title: &'static str,
}

impl ControlsView {
    pub fn from_state(state: &State) -> Self {
        let (cancel_enabled, play_enabled) = match state {
            State::Idle | State::Error { .. } => (false, false),
            State::Recording { .. } | State::RecordingPaused { .. } => (true, false),
            State::Ready { .. } | State::Playing { .. } => (false, true),
        };
        Self {
            record_enabled: true,
            cancel_enabled,
            play_enabled,
            play_title: if matches!(state, State::Playing { .. }) {
                "Stop"
            } else {
                "Play Back"
            },
        }
    }
}
