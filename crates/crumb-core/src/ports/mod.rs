//! Port definitions — trait seams between crates.
//!
//! Ports keep `crumb-core` free of adapter dependencies: implementations live
//! in the adapter crates (voice pipeline, UI shells) and are injected where
//! needed.

mod event_emitter;

pub use event_emitter::{AppEventEmitter, NoopEmitter};
