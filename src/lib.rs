pub mod app;
pub mod audio;
pub mod countdown;
pub mod display;
pub mod effects;
pub mod settings;
pub mod state_machine;

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use app::{run_state_loop, App};
use countdown::{Countdown, TokioClock, TokioPollScheduler};
use display::{format_duration, TimeLabel};
use effects::SimulatedEffectRunner;
use settings::{load_or_init_settings, settings_path, AppSettings};
use state_machine::{Alert, Event};

// ============================================================================
// Console controls standing in for the three buttons
// ============================================================================

/// Map a console line to a button press.
pub fn parse_command(line: &str) -> Option<Event> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "record" => Some(Event::RecordPressed),
        "p" | "play" | "stop" => Some(Event::PlayPressed),
        "c" | "cancel" => Some(Event::CancelPressed),
        "q" | "quit" | "exit" => Some(Event::Exit),
        _ => None,
    }
}

async fn read_commands(tx: mpsc::Sender<Event>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                Some(event) => {
                    log::info!("Command: {}", line.trim());
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => log::warn!("Unknown command {:?} (use r, p, c or q)", line.trim()),
            },
            Ok(None) => {
                let _ = tx.send(Event::Exit).await;
                break;
            }
            Err(e) => {
                log::error!("Failed to read command: {}", e);
                let _ = tx.send(Event::Exit).await;
                break;
            }
        }
    }
}

// ============================================================================
// Application entry point
// ============================================================================

pub fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match settings_path() {
        Ok(path) => load_or_init_settings(&path),
        Err(e) => {
            log::warn!("Settings: {}", e);
            AppSettings::default()
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        // Create event channel for state machine
        let (tx, rx) = mpsc::channel::<Event>(64);

        let mut countdown = Countdown::with_clock(TokioPollScheduler::new(tx.clone()), TokioClock)
            .with_poll_period(settings.poll_interval());
        countdown.set_duration(settings.countdown_duration());

        let memo_path = audio::memo_path(settings.memo_dir.as_deref(), &settings.memo_file_name);
        let setup_error = memo_path.as_ref().err().cloned();
        match &memo_path {
            Ok(path) => log::info!("Memo file: {:?}", path),
            Err(e) => log::error!("Memo file unavailable: {}", e),
        }
        let runner = SimulatedEffectRunner::new(
            memo_path,
            settings.recorder.clone(),
            settings.countdown_duration(),
        );

        let label = Arc::new(TimeLabel::new(format_duration(settings.countdown_duration())));
        let mut app = App::new(countdown, label, runner, tx.clone());
        if let Some(e) = setup_error {
            app.present_alert(Alert::error(e.to_string()));
        }

        tokio::spawn(read_commands(tx));

        log::info!(
            "Thirty-second memo started ({} per take). Commands: r=record, p=play/stop, c=cancel, q=quit",
            format_duration(settings.countdown_duration())
        );
        run_state_loop(app, rx).await;
    });

    // The console reader may still be parked in a blocking stdin read.
    runtime.shutdown_background();
    Ok(())
}
