//! Transcript-to-command interpretation.
//!
//! [`interpret`] is a pure function over the current turn's transcript: same
//! input, same output, no state. The keyword rules are checked in a fixed
//! priority order, first match wins — "stop" preempts "next" when both occur
//! in one utterance, because it is checked first.

use serde::{Deserialize, Serialize};

/// A discrete intent recognized from a listening turn.
///
/// The set is closed and exhaustively matched by consumers.
/// [`VoiceCommand::IngredientQuery`] is declared for forward compatibility
/// but is never produced by [`interpret`] and is ignored by the navigator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceCommand {
    /// Advance to the next instruction step.
    NextStep,
    /// Go back to the previous instruction step.
    PreviousStep,
    /// Read the current instruction aloud.
    ReadInstruction,
    /// Ask about an ingredient (reserved — not yet produced).
    IngredientQuery(String),
    /// Interrupt any in-progress synthesis.
    StopSpeaking,
    /// No command detected.
    #[default]
    None,
}

impl VoiceCommand {
    /// Canned spoken acknowledgment for this command, if it has one.
    ///
    /// `ReadInstruction` deliberately has none: the consumer decides what
    /// text to read for the current step.
    pub const fn acknowledgment(&self) -> Option<&'static str> {
        match self {
            Self::NextStep => Some("Moving on."),
            Self::PreviousStep => Some("Previous step."),
            _ => None,
        }
    }

    /// Stable label for logs and wire events.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NextStep => "next_step",
            Self::PreviousStep => "previous_step",
            Self::ReadInstruction => "read_instruction",
            Self::IngredientQuery(_) => "ingredient_query",
            Self::StopSpeaking => "stop_speaking",
            Self::None => "none",
        }
    }
}

/// Keyword rules in priority order. First rule whose keyword list matches
/// the transcript decides the command.
const RULES: &[(&[&str], VoiceCommand)] = &[
    (&["stop", "quiet"], VoiceCommand::StopSpeaking),
    (&["next", "done"], VoiceCommand::NextStep),
    (&["back", "previous"], VoiceCommand::PreviousStep),
    (&["read", "repeat"], VoiceCommand::ReadInstruction),
];

/// Map a transcript to exactly one [`VoiceCommand`].
///
/// Matching is case-insensitive substring containment. Empty or unmatched
/// text resolves to [`VoiceCommand::None`].
#[must_use]
pub fn interpret(transcript: &str) -> VoiceCommand {
    let lower = transcript.to_lowercase();
    for (keywords, command) in RULES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return command.clone();
        }
    }
    VoiceCommand::None
}
