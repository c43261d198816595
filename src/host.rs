//! Host capability: the OS facilities the watcher consumes
//!
//! The watcher never calls the windowing system directly. Everything it needs
//! (hook install/remove, focus query, owner lookup, process metadata) goes
//! through [`FocusHost`], so the state machine runs unchanged against the
//! Win32 backend or a scripted fake.

use std::sync::Arc;

use crate::error::{LookupError, UnhookFailure, WatcherError};
use crate::snapshot::ProcessInfo;

/// Opaque window handle (HWND value on Windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowRef(pub usize);

/// Owning process/thread of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOwner {
    pub process_id: u32,
    pub thread_id: u32,
}

/// Raw foreground-changed notification as delivered by the OS hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFocusEvent {
    pub window: WindowRef,
    pub event_thread: u32,
    pub timestamp_ms: u32,
}

/// Single registered receiver of raw notifications.
///
/// Called on the host's delivery thread, one event at a time.
pub type EventSink = Arc<dyn Fn(RawFocusEvent) + Send + Sync>;

/// Hook filter options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookOptions {
    /// Ignore foreground changes to windows of this process
    pub skip_own_process: bool,
}

/// OS focus-notification facility
pub trait FocusHost: Send + Sync + 'static {
    /// Live subscription token; dropping it without `unsubscribe` leaks the hook
    type Hook: Send + 'static;

    /// Register `sink` for foreground-changed events only
    fn subscribe(&self, options: HookOptions, sink: EventSink) -> Result<Self::Hook, WatcherError>;

    /// Remove a subscription; no event reaches its sink once this returns,
    /// unless called from within that sink.
    ///
    /// On failure a hook that is still registered comes back in the error
    /// and must be retried, never dropped.
    fn unsubscribe(&self, hook: Self::Hook) -> Result<(), UnhookFailure<Self::Hook>>;

    /// Window currently holding input focus
    fn focused_window(&self) -> Option<WindowRef>;

    /// Owning process/thread ids, `None` if the window no longer exists
    fn owning_process(&self, window: WindowRef) -> Option<WindowOwner>;

    /// Window caption, `None` if unreadable
    fn window_title(&self, window: WindowRef) -> Option<String>;

    /// Live process metadata; fails if the process exited or access is denied
    fn process_info(&self, process_id: u32) -> Result<ProcessInfo, LookupError>;
}
