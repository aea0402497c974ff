//! Event emitter trait for cross-crate event broadcasting.

use crate::events::AppEvent;

/// Trait for emitting application events.
///
/// Implementations handle transport details (channels, native UI bindings,
/// SSE). Keeping the abstraction here prevents channel types from leaking
/// into the public API of services that emit events.
pub trait AppEventEmitter: Send + Sync {
    /// Emit an application event.
    ///
    /// Implementations should buffer or forward asynchronously; this method
    /// must not block.
    fn emit(&self, event: AppEvent);

    /// Clone this emitter into a boxed trait object.
    ///
    /// Enables cloning of `Arc<dyn AppEventEmitter>` without requiring the
    /// underlying type to implement `Clone`.
    fn clone_box(&self) -> Box<dyn AppEventEmitter>;
}

/// A no-op event emitter for tests and headless contexts.
///
/// Discards every event. Useful for unit tests that do not assert on event
/// emission and for CLI tools that have no listener attached.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl AppEventEmitter for NoopEmitter {
    fn emit(&self, _event: AppEvent) {
        // Intentionally do nothing
    }

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}
