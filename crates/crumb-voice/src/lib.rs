#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod audio;
pub mod command;
pub mod error;
pub mod gate;
pub mod kitchen;
pub mod recognizer;
pub mod service;
pub mod session;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::{AudioSession, NullAudioSession};
pub use command::{VoiceCommand, interpret};
pub use error::VoiceError;
pub use gate::HalfDuplexGate;
pub use kitchen::{KitchenMode, NavigatorAction, StepNavigator, display_steps};
pub use recognizer::{
    PermissionStatus, RecognizerEvent, SpeechRecognizer, TranscriptSink, TurnId,
};
pub use service::VoiceService;
pub use session::{
    SessionChannels, SessionState, VoiceEvent, VoiceSession, VoiceSessionConfig,
};
pub use synth::{CompletionSink, SpeechSynthesizer, UtteranceId};

// Dev-dependencies exercised only by the integration suites in tests/
#[cfg(test)]
use tokio_test as _;
#[cfg(test)]
use tracing_subscriber as _;
