//! Voice session error types.

/// Errors that can occur in the kitchen-mode voice session.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// Microphone/speech recognition permission was denied by the user.
    #[error("Speech recognition permission denied")]
    PermissionDenied,

    /// Speech recognition is restricted by device policy.
    #[error("Speech recognition restricted by device policy")]
    PermissionRestricted,

    /// The shared audio session could not be activated for capture.
    #[error("Failed to activate audio session: {0}")]
    AudioSession(String),

    /// The recognizer could not start or sustain a recognition turn.
    #[error("Speech recognition failed: {0}")]
    Recognition(String),

    /// Speech synthesis failed to start.
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// The session has been shut down and can no longer be driven.
    #[error("Voice session closed")]
    SessionClosed,
}
