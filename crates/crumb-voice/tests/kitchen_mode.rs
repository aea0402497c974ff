//! Integration tests for the kitchen-mode driver.
//!
//! Drives a full cooking session over mock speech backends: steps derived
//! from a realistic recipe, the cursor moved by voice commands flowing
//! through the service, instructions read aloud on request, completion at
//! the last step, and microphone teardown on close.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crumb_core::events::AppEvent;
use crumb_core::ports::AppEventEmitter;
use crumb_core::recipe::RecipeStep;
use crumb_voice::{
    CompletionSink, KitchenMode, NullAudioSession, PermissionStatus, SpeechRecognizer,
    SpeechSynthesizer, TranscriptSink, VoiceCommand, VoiceError, VoiceService,
    VoiceSessionConfig,
};

// ── Mock backends ──────────────────────────────────────────────────

struct MockRecognizer {
    turns_begun: AtomicUsize,
    sink: Mutex<Option<TranscriptSink>>,
}

impl MockRecognizer {
    fn new() -> Self {
        Self {
            turns_begun: AtomicUsize::new(0),
            sink: Mutex::new(None),
        }
    }

    fn sink(&self) -> TranscriptSink {
        self.sink.lock().unwrap().clone().expect("no turn started")
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    fn authorization_status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request_authorization(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn begin_turn(&self, sink: TranscriptSink) -> Result<(), VoiceError> {
        self.turns_begun.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn end_turn(&self) {}
}

struct MockSynth {
    spoken: Mutex<Vec<String>>,
    speaking: AtomicBool,
    pending: Mutex<Option<CompletionSink>>,
}

impl MockSynth {
    fn new() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            speaking: AtomicBool::new(false),
            pending: Mutex::new(None),
        }
    }

    fn utterances(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    fn finish_current(&self) {
        self.speaking.store(false, Ordering::SeqCst);
        if let Some(done) = self.pending.lock().unwrap().take() {
            done.finished();
        }
    }
}

impl SpeechSynthesizer for MockSynth {
    fn speak(&self, text: &str, done: CompletionSink) -> Result<(), VoiceError> {
        self.spoken.lock().unwrap().push(text.to_owned());
        self.speaking.store(true, Ordering::SeqCst);
        *self.pending.lock().unwrap() = Some(done);
        Ok(())
    }

    fn stop(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct ChannelEmitter {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl AppEventEmitter for ChannelEmitter {
    fn emit(&self, event: AppEvent) {
        let _ = self.tx.send(event);
    }

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn focaccia_steps() -> Vec<RecipeStep> {
    vec![
        RecipeStep::new(0, "Mix flour and water. Let rest for 30 minutes."),
        RecipeStep::new(1, "Fold the dough! Cover it."),
        RecipeStep::new(2, "Bake until golden."),
    ]
}

struct Harness {
    kitchen: KitchenMode,
    service: Arc<VoiceService>,
    recognizer: Arc<MockRecognizer>,
    synth: Arc<MockSynth>,
    app_events: mpsc::UnboundedReceiver<AppEvent>,
}

fn harness(steps: &[RecipeStep]) -> Harness {
    let recognizer = Arc::new(MockRecognizer::new());
    let synth = Arc::new(MockSynth::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let emitter: Arc<dyn AppEventEmitter> = Arc::new(ChannelEmitter { tx });

    let service = Arc::new(VoiceService::new(
        Arc::clone(&recognizer) as Arc<dyn SpeechRecognizer>,
        Arc::clone(&synth) as Arc<dyn SpeechSynthesizer>,
        Arc::new(NullAudioSession::new()),
        VoiceSessionConfig::default(),
        Arc::clone(&emitter),
    ));
    let kitchen = KitchenMode::new(steps, Arc::clone(&service), emitter);

    Harness {
        kitchen,
        service,
        recognizer,
        synth,
        app_events: rx,
    }
}

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn drain_events(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn opening_announces_the_first_step_and_starts_listening() {
    let mut h = harness(&focaccia_steps());

    h.kitchen.open().await;
    settle().await;

    assert!(h.service.is_listening().await);
    // "Mix flour and water. Let rest..." splits into 5 display steps.
    assert_eq!(h.kitchen.navigator().len(), 5);
    assert_eq!(h.kitchen.navigator().read_current(), Some("Mix flour and water."));

    let events = drain_events(&mut h.app_events);
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::KitchenStepChanged { step_index: 0, step_count: 5 }
    )));
}

#[tokio::test(start_paused = true)]
async fn voice_next_advances_the_cursor_through_the_service() {
    let mut h = harness(&focaccia_steps());
    h.kitchen.open().await;

    // Speak "next" into the mock recognizer and let the driver consume the
    // detected command.
    h.recognizer.sink().partial("ok next please");
    settle().await;

    // Drive the command stream once (the view's command listener).
    let run = tokio::spawn(async move {
        let mut kitchen = h.kitchen;
        kitchen.run().await;
        kitchen
    });
    settle().await;

    // The acknowledgment finishes; the loop relistens.
    h.synth.finish_current();
    settle().await;

    assert_eq!(h.synth.utterances(), vec!["Moving on.".to_owned()]);
    assert!(h.service.is_listening().await);

    let events = drain_events(&mut h.app_events);
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::KitchenStepChanged { step_index: 1, .. }
    )));

    run.abort();
}

#[tokio::test(start_paused = true)]
async fn read_instruction_speaks_the_current_step() {
    let mut h = harness(&focaccia_steps());
    h.kitchen.open().await;
    settle().await;

    h.kitchen.read_current().await;
    settle().await;

    assert_eq!(h.synth.utterances(), vec!["Mix flour and water.".to_owned()]);

    // Reading finishes → the conversation loop re-arms the microphone.
    h.synth.finish_current();
    settle().await;
    assert!(h.service.is_listening().await);
}

#[tokio::test(start_paused = true)]
async fn completing_the_last_step_releases_the_microphone() {
    let steps = vec![RecipeStep::new(0, "Serve.")];
    let mut h = harness(&steps);
    h.kitchen.open().await;
    settle().await;
    assert_eq!(h.kitchen.navigator().len(), 1);

    // "Next" on the only step completes the recipe.
    h.kitchen.next_step().await;
    settle().await;

    assert!(h.kitchen.navigator().is_completed());
    assert!(!h.service.is_listening().await);

    let events = drain_events(&mut h.app_events);
    assert!(events.iter().any(|e| matches!(e, AppEvent::KitchenCompleted)));

    // Victory screen up: no pending timer may reopen the mic.
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    settle().await;
    assert!(!h.service.is_listening().await);
}

#[tokio::test(start_paused = true)]
async fn manual_buttons_share_voice_command_semantics() {
    let mut h = harness(&focaccia_steps());
    h.kitchen.open().await;
    settle().await;

    // Back at the first step is a no-op.
    h.kitchen.previous_step().await;
    assert_eq!(h.kitchen.navigator().index(), 0);

    h.kitchen.next_step().await;
    h.kitchen.next_step().await;
    assert_eq!(h.kitchen.navigator().index(), 2);

    h.kitchen.previous_step().await;
    assert_eq!(h.kitchen.navigator().index(), 1);

    let events = drain_events(&mut h.app_events);
    let changes: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            AppEvent::KitchenStepChanged { step_index, .. } => Some(*step_index),
            _ => None,
        })
        .collect();
    assert_eq!(changes, vec![0, 1, 2, 1]);
}

#[tokio::test(start_paused = true)]
async fn non_navigation_commands_leave_the_cursor_alone() {
    let mut h = harness(&focaccia_steps());
    h.kitchen.open().await;
    settle().await;

    h.kitchen.handle_command(&VoiceCommand::StopSpeaking).await;
    h.kitchen
        .handle_command(&VoiceCommand::IngredientQuery("yeast".to_owned()))
        .await;
    assert_eq!(h.kitchen.navigator().index(), 0);
    assert!(h.synth.utterances().is_empty());
}

#[tokio::test(start_paused = true)]
async fn close_releases_the_microphone_and_is_idempotent() {
    let mut h = harness(&focaccia_steps());
    h.kitchen.open().await;
    settle().await;
    assert!(h.service.is_listening().await);

    h.kitchen.close().await;
    settle().await;
    assert!(!h.service.is_listening().await);

    // Closing again (or after a manual stop) stays quiet.
    h.kitchen.close().await;
    assert!(!h.service.is_listening().await);

    // No dangling relisten timer either.
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    settle().await;
    assert!(!h.service.is_listening().await);
}

#[tokio::test(start_paused = true)]
async fn empty_recipe_still_opens_with_the_fallback_step() {
    let mut h = harness(&[]);
    h.kitchen.open().await;
    settle().await;

    assert_eq!(h.kitchen.navigator().steps(), ["Ready to cook!"]);
    assert_eq!(h.kitchen.navigator().read_current(), Some("Ready to cook!"));
    assert!(h.service.is_listening().await);
}
