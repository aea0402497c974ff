//! Kitchen mode — step derivation, the navigation cursor, and the driver
//! that wires voice commands to it.
//!
//! Raw recipe steps are free text and often pack several sentences into one
//! step. [`display_steps`] breaks them into display-sized sentences once, up
//! front; the [`StepNavigator`] then moves a clamped cursor over that fixed
//! sequence. [`KitchenMode`] glues the navigator to a [`VoiceService`]: it
//! consumes detected commands, moves the cursor, asks the service to read
//! instructions aloud, and guarantees the microphone is released on teardown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crumb_core::events::AppEvent;
use crumb_core::ports::AppEventEmitter;
use crumb_core::recipe::RecipeStep;

use crate::command::VoiceCommand;
use crate::service::VoiceService;

/// Shown when a recipe has no usable instruction text at all.
const EMPTY_RECIPE_FALLBACK: &str = "Ready to cook!";

// ── Step derivation ───────────────────────────────────────────────────────────

/// Break raw recipe steps into display-sized sentences.
///
/// Deterministic and side-effect free: `!` and `?` are normalized to `.`,
/// each step is split strictly on `.` (so `"Mix.Bake"` splits without a
/// space), fragments are whitespace-trimmed, empties are dropped, and the
/// trailing period is re-added for display. Sentence order follows step
/// order. A recipe that yields nothing falls back to a single placeholder
/// step.
#[must_use]
pub fn display_steps(steps: &[RecipeStep]) -> Vec<String> {
    let mut broken_down: Vec<String> = Vec::new();

    for step in steps {
        let standardized = step.instruction.replace(['!', '?'], ".");
        for sentence in standardized.split('.') {
            let sentence = sentence.trim();
            if !sentence.is_empty() {
                broken_down.push(format!("{sentence}."));
            }
        }
    }

    if broken_down.is_empty() {
        return vec![EMPTY_RECIPE_FALLBACK.to_owned()];
    }
    broken_down
}

// ── Navigator ─────────────────────────────────────────────────────────────────

/// Outcome of applying a command (or a manual button press) to the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigatorAction {
    /// The cursor moved to this zero-based index.
    StepChanged(usize),
    /// The last step was completed; the cursor did not move.
    Completed,
    /// This text should be spoken aloud.
    Speak(String),
}

/// Cursor over the derived step sequence.
///
/// The index is always within `[0, len - 1]`; neither voice commands nor
/// manual navigation can move it out of range.
#[derive(Debug, Clone)]
pub struct StepNavigator {
    steps: Vec<String>,
    index: usize,
    completed: bool,
}

impl StepNavigator {
    /// Build a navigator over the derived steps of `steps`, cursor at 0.
    #[must_use]
    pub fn new(steps: &[RecipeStep]) -> Self {
        Self {
            steps: display_steps(steps),
            index: 0,
            completed: false,
        }
    }

    /// The derived display steps.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Current zero-based cursor position.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of display steps (always at least 1).
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false` — the fallback step guarantees at least one entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether the last step has been completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Text of the current step, or `None` if the cursor is somehow out of
    /// range (never panics).
    #[must_use]
    pub fn read_current(&self) -> Option<&str> {
        self.steps.get(self.index).map(String::as_str)
    }

    /// Move forward one step; completing the last step reports `Completed`
    /// without moving the cursor.
    pub fn advance(&mut self) -> NavigatorAction {
        if self.index + 1 < self.steps.len() {
            self.index += 1;
            NavigatorAction::StepChanged(self.index)
        } else {
            self.completed = true;
            NavigatorAction::Completed
        }
    }

    /// Move back one step; no-op at the first step.
    pub fn retreat(&mut self) -> Option<NavigatorAction> {
        if self.index > 0 {
            self.index -= 1;
            Some(NavigatorAction::StepChanged(self.index))
        } else {
            None
        }
    }

    /// Apply a voice command to the cursor.
    ///
    /// Only the navigation commands do anything; `StopSpeaking` is handled
    /// inside the session, `IngredientQuery` is reserved, and `None` never
    /// reaches consumers.
    pub fn apply(&mut self, command: &VoiceCommand) -> Option<NavigatorAction> {
        match command {
            VoiceCommand::NextStep => Some(self.advance()),
            VoiceCommand::PreviousStep => self.retreat(),
            VoiceCommand::ReadInstruction => self
                .read_current()
                .map(|text| NavigatorAction::Speak(text.to_owned())),
            _ => None,
        }
    }
}

// ── Kitchen mode driver ───────────────────────────────────────────────────────

/// Drives one kitchen-mode cooking session for a recipe.
///
/// Created when the kitchen view opens and closed (or dropped) when it
/// dismisses. Owns the navigator and the command stream; the service itself
/// is shared so the UI can still toggle the microphone directly.
pub struct KitchenMode {
    navigator: StepNavigator,
    service: Arc<VoiceService>,
    emitter: Arc<dyn AppEventEmitter>,
    commands: Option<mpsc::UnboundedReceiver<VoiceCommand>>,
    closed: bool,
}

impl KitchenMode {
    /// Build a kitchen-mode session over `steps`.
    ///
    /// Takes the service's command stream; the caller should construct at
    /// most one `KitchenMode` per service.
    #[must_use]
    pub fn new(
        steps: &[RecipeStep],
        service: Arc<VoiceService>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        let commands = service.take_commands();
        Self {
            navigator: StepNavigator::new(steps),
            service,
            emitter,
            commands,
            closed: false,
        }
    }

    /// The navigator (for UI rendering of steps and cursor).
    #[must_use]
    pub const fn navigator(&self) -> &StepNavigator {
        &self.navigator
    }

    /// Open the session: announce the initial cursor position and start the
    /// listening loop.
    ///
    /// Permission refusal is surfaced through events and left for the user
    /// to resolve; the kitchen view stays usable with manual buttons.
    pub async fn open(&mut self) {
        info!(steps = self.navigator.len(), "Kitchen mode opened");
        self.emit_step_changed(self.navigator.index());
        if let Err(e) = self.service.start_listening().await {
            tracing::warn!(error = %e, "Kitchen mode opened without voice control");
        }
    }

    /// Consume detected commands until the recipe is completed or the
    /// command stream closes.
    ///
    /// Returns immediately if the command stream was already taken by
    /// another consumer.
    pub async fn run(&mut self) {
        let Some(mut commands) = self.commands.take() else {
            tracing::warn!("Kitchen mode has no command stream to drive it");
            return;
        };

        while let Some(command) = commands.recv().await {
            self.handle_command(&command).await;
            if self.navigator.is_completed() {
                break;
            }
        }
    }

    /// Apply one command to the navigator and perform its side effects.
    pub async fn handle_command(&mut self, command: &VoiceCommand) {
        match self.navigator.apply(command) {
            Some(NavigatorAction::StepChanged(index)) => {
                self.emit_step_changed(index);
            }
            Some(NavigatorAction::Completed) => {
                info!("Recipe completed — releasing the microphone");
                self.service.stop_listening().await;
                self.emitter.emit(AppEvent::KitchenCompleted);
            }
            Some(NavigatorAction::Speak(text)) => {
                if let Err(e) = self.service.speak(&text).await {
                    tracing::warn!(error = %e, "Failed to read instruction aloud");
                }
            }
            None => {}
        }
    }

    /// Manual next button — same semantics as the `NextStep` voice command.
    pub async fn next_step(&mut self) {
        self.handle_command(&VoiceCommand::NextStep).await;
    }

    /// Manual back button — same semantics as the `PreviousStep` command.
    pub async fn previous_step(&mut self) {
        self.handle_command(&VoiceCommand::PreviousStep).await;
    }

    /// Read the current step aloud.
    pub async fn read_current(&mut self) {
        self.handle_command(&VoiceCommand::ReadInstruction).await;
    }

    /// Tear the session down: silence synthesis and release the microphone.
    ///
    /// Idempotent. Called on view dismissal; `Drop` performs the same
    /// teardown as a backstop.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.service.stop_speaking().await;
        self.service.stop_listening().await;
        info!("Kitchen mode closed");
    }

    fn emit_step_changed(&self, index: usize) {
        self.emitter.emit(AppEvent::KitchenStepChanged {
            step_index: index,
            step_count: self.navigator.len(),
        });
    }
}

impl Drop for KitchenMode {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Backstop for a dropped-without-close view: release the audio
        // route asynchronously if a runtime is still around.
        let service = Arc::clone(&self.service);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                service.stop_speaking().await;
                service.stop_listening().await;
            });
        }
    }
}
