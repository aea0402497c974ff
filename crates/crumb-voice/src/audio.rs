//! Audio session abstraction.
//!
//! The microphone route is a process-wide singleton with exactly one owner:
//! the [`VoiceSession`](crate::session::VoiceSession). No other component
//! activates or deactivates it directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::VoiceError;

/// Handle on the shared platform audio session.
///
/// Implementations wrap the OS audio route (capture category, speaker
/// routing). Both operations must be idempotent: the session calls
/// [`deactivate`](Self::deactivate) on every teardown path without tracking
/// whether activation succeeded.
pub trait AudioSession: Send + Sync {
    /// Activate the session for capture.
    ///
    /// Failure is non-fatal to the app: the caller aborts the listen attempt
    /// and stays idle.
    fn activate(&self) -> Result<(), VoiceError>;

    /// Deactivate the session and release the capture route. Idempotent.
    fn deactivate(&self);

    /// Whether the session is currently active.
    fn is_active(&self) -> bool;
}

/// Flag-only audio session for headless contexts and tests.
///
/// Tracks activation state without touching any hardware.
#[derive(Debug, Clone, Default)]
pub struct NullAudioSession {
    active: Arc<AtomicBool>,
}

impl NullAudioSession {
    /// Create a new inactive session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSession for NullAudioSession {
    fn activate(&self) -> Result<(), VoiceError> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
