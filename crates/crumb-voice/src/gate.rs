//! Half-duplex gate — listening and speaking never overlap.
//!
//! The kitchen-mode session shares one audio route between the microphone and
//! the synthesizer. While synthesis is audible the microphone must be
//! suppressed, otherwise the session would hear its own acknowledgments and
//! loop on them. This module provides the shared atomic flag for that
//! coordination.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag coordinating audio capture and synthesis playback.
///
/// When `is_system_speaking` is `true`:
/// - capture backends discard incoming audio
/// - the session refuses to install a new recognition tap
///
/// The session sets the flag when synthesis starts and clears it when
/// playback finishes or is interrupted.
#[derive(Debug, Clone)]
pub struct HalfDuplexGate {
    is_system_speaking: Arc<AtomicBool>,
}

impl HalfDuplexGate {
    /// Create a new gate (initially silent).
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_system_speaking: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark synthesis playback as active; capture is gated until
    /// [`speaking_finished`](Self::speaking_finished).
    pub fn speaking_started(&self) {
        self.is_system_speaking.store(true, Ordering::SeqCst);
        tracing::debug!("Half-duplex gate closed — mic suppressed");
    }

    /// Mark synthesis playback as over; capture may resume.
    pub fn speaking_finished(&self) {
        self.is_system_speaking.store(false, Ordering::SeqCst);
        tracing::debug!("Half-duplex gate open — mic available");
    }

    /// Whether synthesis playback is currently active.
    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.is_system_speaking.load(Ordering::SeqCst)
    }
}

impl Default for HalfDuplexGate {
    fn default() -> Self {
        Self::new()
    }
}
