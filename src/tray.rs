//! System tray integration using tray-icon crate

use active_window_watcher::FocusSnapshot;
use muda::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
use thiserror::Error;
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

const ICON_SIZE: u32 = 32;

#[derive(Debug, Error)]
pub enum TrayError {
    #[error("Tray icon creation failed: {0}")]
    Creation(String),

    #[error("Menu operation failed: {0}")]
    Menu(String),
}

/// System tray state and menu IDs
pub struct TrayState {
    icon: TrayIcon,
    menu_enabled: MenuId,
    menu_raise_events: MenuId,
    menu_reset: MenuId,
    menu_exit: MenuId,
    status_item: MenuItem,
    enabled_item: CheckMenuItem,
    raise_events_item: CheckMenuItem,
}

impl TrayState {
    /// Create tray icon with menu
    pub fn new() -> Result<Self, TrayError> {
        // Create menu items
        let status_item = MenuItem::with_id("status", "No focus data", false, None);
        let enabled_item = CheckMenuItem::with_id("enabled", "Watch focus", true, false, None);
        let raise_events_item =
            CheckMenuItem::with_id("raise_events", "Log changes", true, true, None);
        let reset_item = MenuItem::with_id("reset", "Reset settings", true, None);
        let exit_item = MenuItem::with_id("exit", "Exit", true, None);

        // Store IDs
        let menu_enabled = enabled_item.id().clone();
        let menu_raise_events = raise_events_item.id().clone();
        let menu_reset = reset_item.id().clone();
        let menu_exit = exit_item.id().clone();

        // Build menu
        let menu = Menu::new();
        menu.append(&status_item)
            .map_err(|e| TrayError::Menu(e.to_string()))?;
        menu.append(&PredefinedMenuItem::separator())
            .map_err(|e| TrayError::Menu(e.to_string()))?;
        menu.append(&enabled_item)
            .map_err(|e| TrayError::Menu(e.to_string()))?;
        menu.append(&raise_events_item)
            .map_err(|e| TrayError::Menu(e.to_string()))?;
        menu.append(&reset_item)
            .map_err(|e| TrayError::Menu(e.to_string()))?;
        menu.append(&PredefinedMenuItem::separator())
            .map_err(|e| TrayError::Menu(e.to_string()))?;
        menu.append(&exit_item)
            .map_err(|e| TrayError::Menu(e.to_string()))?;

        let icon = create_default_icon()?;

        // Build tray icon
        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip("Active Window Watcher")
            .with_icon(icon)
            .build()
            .map_err(|e| TrayError::Creation(e.to_string()))?;

        Ok(Self {
            icon: tray,
            menu_enabled,
            menu_raise_events,
            menu_reset,
            menu_exit,
            status_item,
            enabled_item,
            raise_events_item,
        })
    }

    /// Update status display (current focus owner)
    pub fn update_status(&self, snapshot: &FocusSnapshot) {
        let text = status_text(snapshot);
        self.status_item.set_text(&text);
        if let Err(e) = self.icon.set_tooltip(Some(&text)) {
            tracing::warn!("Tray tooltip update failed: {e}");
        }
    }

    /// Sync "Watch focus" check mark with watcher state
    pub fn set_enabled_checked(&self, checked: bool) {
        self.enabled_item.set_checked(checked);
    }

    /// Sync "Log changes" check mark with the raise-events setting
    pub fn set_raise_events_checked(&self, checked: bool) {
        self.raise_events_item.set_checked(checked);
    }

    /// Check if event matches "Watch focus" toggle
    pub fn is_enabled(&self, id: &MenuId) -> bool {
        *id == self.menu_enabled
    }

    /// Check if event matches "Log changes" toggle
    pub fn is_raise_events(&self, id: &MenuId) -> bool {
        *id == self.menu_raise_events
    }

    /// Check if event matches reset settings menu
    pub fn is_reset(&self, id: &MenuId) -> bool {
        *id == self.menu_reset
    }

    /// Check if event matches exit menu
    pub fn is_exit(&self, id: &MenuId) -> bool {
        *id == self.menu_exit
    }
}

/// Get menu event receiver
pub fn menu_receiver() -> &'static muda::MenuEventReceiver {
    MenuEvent::receiver()
}

/// Solid square icon (no embedded resource)
fn create_default_icon() -> Result<Icon, TrayError> {
    let rgba = [0x2e, 0x86, 0xc1, 0xff]
        .repeat((ICON_SIZE * ICON_SIZE) as usize);
    Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE).map_err(|e| TrayError::Creation(e.to_string()))
}

/// "module (pid) - title", truncated for menu display
fn status_text(snapshot: &FocusSnapshot) -> String {
    if snapshot.is_empty() {
        return "No focus data".to_string();
    }
    let module = snapshot.module_name().unwrap_or("unknown");
    match snapshot.window_title() {
        Some(title) => format!(
            "{} ({}) - {}",
            module,
            snapshot.process_id,
            truncate_title(title, 30)
        ),
        None => format!("{} ({})", module, snapshot.process_id),
    }
}

/// Truncate title with ellipsis if too long (char-based, UTF-8 safe)
fn truncate_title(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let end = s
            .char_indices()
            .nth(max_chars.saturating_sub(3))
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        format!("{}...", &s[..end])
    }
}
