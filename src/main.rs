// Hide console in release builds (background mode)
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(windows)]
mod notification;
#[cfg(windows)]
mod tray;

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    app::run()
}

#[cfg(not(windows))]
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    anyhow::bail!("active-window-watcher requires Windows")
}

#[cfg(windows)]
mod app {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::Receiver;

    use active_window_watcher::{FocusSnapshot, Watcher, Win32Host, config};
    use tracing::{error, info};
    use windows::Win32::System::Console::{
        CTRL_BREAK_EVENT, CTRL_C_EVENT, CTRL_CLOSE_EVENT, SetConsoleCtrlHandler,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, MSG, MWMO_INPUTAVAILABLE, MsgWaitForMultipleObjectsEx, PM_REMOVE,
        PeekMessageW, QS_ALLINPUT, TranslateMessage, WM_ENDSESSION, WM_QUERYENDSESSION, WM_QUIT,
    };
    use windows::core::BOOL;

    use crate::notification;
    use crate::tray::{self, TrayState};

    /// Shutdown requested via signal (Ctrl-C, console close, etc.)
    static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

    /// Console control handler: signal shutdown via atomic flag
    unsafe extern "system" fn ctrl_handler(ctrl_type: u32) -> BOOL {
        match ctrl_type {
            x if x == CTRL_C_EVENT || x == CTRL_BREAK_EVENT || x == CTRL_CLOSE_EVENT => {
                SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
                BOOL(1)
            }
            _ => BOOL(0),
        }
    }

    pub fn run() -> anyhow::Result<()> {
        tracing_subscriber::fmt::init();

        let mut config = config::load();
        info!(?config, "Settings loaded");

        let tray = TrayState::new().map_err(|e| anyhow::anyhow!("TrayState: {e}"))?;
        tray.set_raise_events_checked(config.raise_events);
        info!("System tray initialized");

        let watcher = Watcher::with_config(Win32Host::new(), &config);
        let changes = watcher.changes();

        // Hook refusal is the only actionable failure: report it, keep the tray
        if let Err(e) = watcher.enable() {
            error!("Focus hook error: {e}");
            notification::show_hook_failed(&e.to_string());
        }
        tray.set_enabled_checked(watcher.is_enabled());
        tray.update_status(&watcher.snapshot());

        unsafe { SetConsoleCtrlHandler(Some(ctrl_handler), true) }
            .map_err(|e| anyhow::anyhow!("SetConsoleCtrlHandler: {e}"))?;

        run_event_loop(&watcher, &changes, &tray, &mut config)?;

        watcher.disable();
        Ok(())
    }

    fn run_event_loop(
        watcher: &Watcher<Win32Host>,
        changes: &Receiver<Arc<FocusSnapshot>>,
        tray: &TrayState,
        config: &mut config::WatcherConfig,
    ) -> anyhow::Result<()> {
        let menu_rx = tray::menu_receiver();
        let mut msg = MSG::default();
        let mut shown = watcher.snapshot();

        loop {
            if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
                info!("Shutdown requested");
                return Ok(());
            }

            // Wait for message OR 16ms timeout
            unsafe {
                MsgWaitForMultipleObjectsEx(None, 16, QS_ALLINPUT, MWMO_INPUTAVAILABLE);
            }

            // Change notifications (non-blocking)
            while let Ok(snapshot) = changes.try_recv() {
                info!(
                    pid = snapshot.process_id,
                    tid = snapshot.thread_id,
                    module = snapshot.module_name().unwrap_or("?"),
                    title = snapshot.window_title().unwrap_or(""),
                    "Foreground window changed"
                );
            }

            // Status follows the accessors, so it stays live with logging off
            let current = watcher.snapshot();
            if !Arc::ptr_eq(&current, &shown) {
                tray.update_status(&current);
                shown = current;
            }

            while let Ok(event) = menu_rx.try_recv() {
                handle_menu_event(&event, watcher, tray, config);
            }

            // Process Win32 messages
            while unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE) }.as_bool() {
                match msg.message {
                    WM_QUIT => return Ok(()),
                    WM_QUERYENDSESSION => {
                        // Allow system to proceed with logoff/shutdown
                    }
                    WM_ENDSESSION if msg.wParam.0 != 0 => {
                        info!("Session ending");
                        return Ok(());
                    }
                    _ => unsafe {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    },
                }
            }
        }
    }

    /// Handle tray menu events
    fn handle_menu_event(
        event: &muda::MenuEvent,
        watcher: &Watcher<Win32Host>,
        tray: &TrayState,
        config: &mut config::WatcherConfig,
    ) {
        let id = event.id();

        if tray.is_exit(id) {
            info!("Exit requested via tray menu");
            SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        } else if tray.is_enabled(id) {
            let enable = !watcher.is_enabled();
            if let Err(e) = watcher.set_enabled(enable) {
                error!("Focus hook error: {e}");
                notification::show_hook_failed(&e.to_string());
            }
            tray.set_enabled_checked(watcher.is_enabled());
            info!(enabled = watcher.is_enabled(), "Focus watching toggled");
        } else if tray.is_raise_events(id) {
            config.raise_events = !watcher.enable_raising_events();
            watcher.set_enable_raising_events(config.raise_events);
            tray.set_raise_events_checked(config.raise_events);
            if let Err(e) = config::save(config) {
                error!("Settings save failed: {e}");
            }
            info!(raise_events = config.raise_events, "Change logging toggled");
        } else if tray.is_reset(id) {
            if let Err(e) = config::clear() {
                error!("Settings reset failed: {e}");
                return;
            }
            // Hook options stay as installed until the next start
            *config = config::load();
            watcher.set_enable_raising_events(config.raise_events);
            tray.set_raise_events_checked(config.raise_events);
            info!(?config, "Settings reset");
        }
    }
}
