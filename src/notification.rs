//! Desktop notification support

use notify_rust::Notification;

/// Show toast notification when the foreground hook cannot be installed
pub fn show_hook_failed(reason: &str) {
    if let Err(e) = Notification::new()
        .summary("Active Window Watcher")
        .body(&format!("Focus tracking unavailable: {}", reason))
        .show()
    {
        tracing::warn!("Notification failed: {e}");
    }
}
