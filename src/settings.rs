use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::RecorderSettings;
use crate::countdown::DEFAULT_POLL_PERIOD;

const SETTINGS_DIR_NAME: &str = "thirty-second-memo";
const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Length of a take and of the countdown, in seconds. Fractions allowed.
    pub countdown_secs: f64,

    /// How often the countdown re-checks its deadline while running.
    pub poll_interval_ms: u64,

    /// File name of the memo inside the memo directory.
    pub memo_file_name: String,

    /// Store the memo here instead of the user's documents directory.
    pub memo_dir: Option<PathBuf>,

    pub recorder: RecorderSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            countdown_secs: 30.0,
            poll_interval_ms: DEFAULT_POLL_PERIOD.as_millis() as u64,
            memo_file_name: "MyAudioMemo.m4a".to_string(),
            memo_dir: None,
            recorder: RecorderSettings::default(),
        }
    }
}

impl AppSettings {
    /// Countdown length; negative or non-finite values count as zero.
    pub fn countdown_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.countdown_secs).unwrap_or(Duration::ZERO)
    }

    /// Poll period, never shorter than one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

pub fn settings_path() -> Result<PathBuf, String> {
    let dir = dirs::config_dir().ok_or_else(|| "Could not determine config directory".to_string())?;
    Ok(dir.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
}

pub fn load_settings(path: &Path) -> AppSettings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<AppSettings>(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Settings: failed to parse {:?}: {}", path, e);
                AppSettings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppSettings::default(),
        Err(e) => {
            log::warn!("Settings: failed to read {:?}: {}", path, e);
            AppSettings::default()
        }
    }
}

/// Load settings, writing the defaults out on first run so they can be edited.
pub fn load_or_init_settings(path: &Path) -> AppSettings {
    if path.exists() {
        return load_settings(path);
    }
    let settings = AppSettings::default();
    match save_settings(path, &settings) {
        Ok(()) => log::info!("Settings: wrote defaults to {:?}", path),
        Err(e) => log::warn!("Settings: {}", e),
    }
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
    }

    let contents =
        serde_json::to_string_pretty(settings).map_err(|e| format!("Serialize settings: {}", e))?;

    // Write to a temp file in the same directory, then rename over the target.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &contents)
        .map_err(|e| format!("Write temp settings {:?}: {}", tmp_path, e))?;

    // Windows rename fails if the destination exists.
    if cfg!(windows) && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(format!("Remove existing settings file {:?}: {}", path, e));
            }
        }
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| format!("Rename temp settings {:?} to {:?}: {}", tmp_path, path, e))?;
    Ok(())
}
