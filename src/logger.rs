use std::ffi::c_void;

/// Hooks for observing node lifecycle events in a [`crate::Tree`].
///
/// Implementations are invoked synchronously from the thread performing the
/// corresponding operation; they must not block, or they become part of
/// that operation's critical section.
pub trait Log {
    /// Called when a new node is allocated by `create`.
    fn log_new(ptr: *const c_void);
    /// Called when a node is permanently removed by `remove`.
    fn log_drop(ptr: *const c_void);
}

/// A logger that does nothing. The default for [`crate::Tree`].
pub struct NoopLogger;

impl Log for NoopLogger {
    fn log_new(_ptr: *const c_void) {}
    fn log_drop(_ptr: *const c_void) {}
}

/// A logger that emits `tracing` events for node creation and removal.
pub struct TracingLogger;

impl Log for TracingLogger {
    fn log_new(ptr: *const c_void) {
        tracing::trace!(node = ?ptr, "node created");
    }

    fn log_drop(ptr: *const c_void) {
        tracing::trace!(node = ?ptr, "node removed");
    }
}
