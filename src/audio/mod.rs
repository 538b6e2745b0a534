//! Audio collaborators for the memo recorder
//!
//! Capture and playback engines are external; this module owns where the
//! memo lives and how the recorder is configured.

mod paths;
pub mod recorder;

pub use paths::{document_dir, ensure_memo_dir, memo_path, memo_path_in, DOCUMENT_DIR_ERROR};
pub use recorder::{AudioError, AudioFormat, EncoderQuality, RecorderSettings};
