//! Active Window Watcher: observe which process owns the system-wide input
//! focus and get notified when it changes.
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> Result<(), active_window_watcher::WatcherError> {
//! use active_window_watcher::{Watcher, Win32Host};
//!
//! let watcher = Watcher::new(Win32Host::new());
//! watcher.subscribe(|snap| println!("{} {:?}", snap.process_id, snap.module_name()));
//! watcher.enable()?;
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

pub mod config;
pub mod error;
pub mod hook;
pub mod host;
pub mod resolver;
pub mod snapshot;
pub mod watcher;
#[cfg(windows)]
pub mod win32;

#[cfg(test)]
mod fake;

pub use config::WatcherConfig;
pub use error::{
    ConfigError, LookupError, ResolveError, UnhookError, UnhookFailure, WatcherError,
};
pub use host::{FocusHost, HookOptions, RawFocusEvent, WindowOwner, WindowRef};
pub use resolver::FocusStateResolver;
pub use snapshot::{FocusSnapshot, ProcessInfo};
pub use watcher::{SubscriptionId, SubscriptionState, Watcher};
#[cfg(windows)]
pub use win32::Win32Host;
