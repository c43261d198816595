//! Error types for active-window-watcher

use thiserror::Error;

use crate::host::WindowRef;

/// Watcher errors surfaced to the caller of `enable`
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("SetWinEventHook → invalid handle")]
    HookInstall,

    #[error("Hook thread spawn failed: {0}")]
    HookThread(#[from] std::io::Error),
}

/// Hook teardown errors (logged, never surfaced)
#[derive(Debug, Error)]
pub enum UnhookError {
    #[error("UnhookWinEvent failed")]
    Unhook,

    #[error("PostThreadMessage(WM_QUIT) → thread {0} gone")]
    PostQuit(u32),
}

/// Failed unsubscribe. A hook still registered is handed back for retry.
#[derive(Debug)]
pub struct UnhookFailure<K> {
    pub error: UnhookError,
    pub hook: Option<K>,
}

/// Process metadata lookup failure reported by the host
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("OpenProcess({pid}) failed: {reason}")]
pub struct LookupError {
    pub pid: u32,
    pub reason: String,
}

/// Focus resolution errors (graceful degradation)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("GetForegroundWindow → ∅")]
    NoForegroundWindow,

    #[error("GetWindowThreadProcessId → window gone")]
    WindowGone,

    /// Owner found, process metadata not: carries what was resolved
    #[error("OpenProcess({pid}) failed: {reason}")]
    ProcessLookup {
        pid: u32,
        thread_id: u32,
        window: WindowRef,
        reason: String,
    },
}

/// Settings persistence errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Registry access failed: {0}")]
    Registry(#[from] std::io::Error),
}
