//! Recorder configuration and audio errors

use serde::{Deserialize, Serialize};

use super::paths::DOCUMENT_DIR_ERROR;

/// Errors that can occur while setting up or running the audio services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    NoDocumentDirectory,
    RecorderCreationFailed(String),
    PlayerCreationFailed(String),
    FileCreationFailed(String),
    WriteFailed(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::NoDocumentDirectory => write!(f, "{}", DOCUMENT_DIR_ERROR),
            AudioError::RecorderCreationFailed(e) => {
                write!(f, "Failed to create audio recorder: {}", e)
            }
            AudioError::PlayerCreationFailed(e) => {
                write!(f, "Failed to initialize audio player: {}", e)
            }
            AudioError::FileCreationFailed(e) => write!(f, "Failed to create memo file: {}", e),
            AudioError::WriteFailed(e) => write!(f, "Failed to write audio data: {}", e),
        }
    }
}

impl std::error::Error for AudioError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioFormat {
    Mpeg4Aac,
    LinearPcm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncoderQuality {
    Low,
    Medium,
    High,
}

/// Settings handed to the capture engine when a take starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    pub format: AudioFormat,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub quality: EncoderQuality,
    pub metering_enabled: bool,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            format: AudioFormat::Mpeg4Aac,
            sample_rate_hz: 44_100,
            channels: 2,
            quality: EncoderQuality::High,
            metering_enabled: true,
        }
    }
}

impl RecorderSettings {
    /// Reject settings no capture engine can honour.
    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate_hz == 0 {
            return Err(AudioError::RecorderCreationFailed(
                "sample rate must be positive".to_string(),
            ));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(AudioError::RecorderCreationFailed(format!(
                "unsupported channel count {}",
                self.channels
            )));
        }
        Ok(())
    }
}
