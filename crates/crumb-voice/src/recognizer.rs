//! Speech recognizer trait seam.
//!
//! A recognizer streams microphone audio into incremental transcripts for one
//! listening turn at a time. Platform backends (on-device speech APIs, remote
//! STT) implement [`SpeechRecognizer`]; the session owns the turn lifecycle
//! and discards events from turns it has already cancelled.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::VoiceError;
use crate::session::SessionSignal;

/// Authorization state of the microphone/speech-recognition permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// The user has not been asked yet.
    Undetermined,
    /// Granted — recognition may start.
    Granted,
    /// Denied by the user.
    Denied,
    /// Blocked by device policy (parental controls, MDM).
    Restricted,
}

/// Identifier of one listening turn.
///
/// The session bumps its generation counter on every turn start and teardown;
/// recognizer events tagged with an older id are dropped, which makes late
/// callbacks after cancellation harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(pub(crate) u64);

impl TurnId {
    pub(crate) const fn value(self) -> u64 {
        self.0
    }
}

/// Incremental output of a recognition turn.
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// A partial hypothesis. Replaces the previous transcript, never appends.
    Partial {
        /// Best transcription so far.
        text: String,
    },
    /// The final result for this turn; no further events will follow.
    Final {
        /// Final transcription.
        text: String,
    },
    /// The turn failed. Treated as an ordinary turn boundary, not fatal.
    Error {
        /// Backend error description.
        message: String,
    },
}

/// Delivery handle for one recognition turn.
///
/// Wraps the session's internal signal channel together with the turn id, so
/// backends never see channel or turn-bookkeeping types. Sending after the
/// session cancelled the turn is a silent no-op.
#[derive(Debug, Clone)]
pub struct TranscriptSink {
    turn: TurnId,
    tx: mpsc::UnboundedSender<SessionSignal>,
}

impl TranscriptSink {
    pub(crate) const fn new(turn: TurnId, tx: mpsc::UnboundedSender<SessionSignal>) -> Self {
        Self { turn, tx }
    }

    /// The turn this sink belongs to.
    #[must_use]
    pub const fn turn(&self) -> TurnId {
        self.turn
    }

    /// Deliver a partial hypothesis.
    pub fn partial(&self, text: impl Into<String>) {
        self.send(RecognizerEvent::Partial { text: text.into() });
    }

    /// Deliver the final result for this turn.
    pub fn finalized(&self, text: impl Into<String>) {
        self.send(RecognizerEvent::Final { text: text.into() });
    }

    /// Report a turn failure.
    pub fn error(&self, message: impl Into<String>) {
        self.send(RecognizerEvent::Error {
            message: message.into(),
        });
    }

    fn send(&self, event: RecognizerEvent) {
        // Receiver gone means the session was dropped — nothing to do.
        let _ = self.tx.send(SessionSignal::Recognizer {
            turn: self.turn,
            event,
        });
    }
}

/// Platform speech recognizer.
///
/// At most one turn is active per recognizer. [`begin_turn`](Self::begin_turn)
/// must tear down any leftover tap before installing a new one;
/// [`end_turn`](Self::end_turn) must be idempotent and safe to call while a
/// result callback is in flight.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Current permission state, without prompting the user.
    fn authorization_status(&self) -> PermissionStatus;

    /// Prompt the user for permission and wait for the decision.
    ///
    /// This is the only potentially slow, user-blocking operation in the
    /// session; everything else is fire-and-forget.
    async fn request_authorization(&self) -> PermissionStatus;

    /// Install the audio tap and start streaming recognition results into
    /// `sink` until the turn ends or is cancelled.
    fn begin_turn(&self, sink: TranscriptSink) -> Result<(), VoiceError>;

    /// Remove the tap and cancel the in-flight recognition task. Idempotent.
    fn end_turn(&self);
}
