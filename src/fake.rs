//! Scripted in-memory host for tests: synthesizes focus notifications

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;

use crate::error::{LookupError, UnhookError, UnhookFailure, WatcherError};
use crate::host::{EventSink, FocusHost, HookOptions, RawFocusEvent, WindowOwner, WindowRef};
use crate::snapshot::ProcessInfo;

#[derive(Debug, Clone)]
struct FakeWindow {
    owner: WindowOwner,
    title: Option<String>,
}

#[derive(Default)]
struct State {
    windows: HashMap<WindowRef, FakeWindow>,
    processes: HashMap<u32, String>,
    focused: Option<WindowRef>,
    sinks: HashMap<u64, EventSink>,
    next_hook: u64,
    installs: usize,
    refuse_install: bool,
    last_options: Option<HookOptions>,
    resolve_delay: Duration,
    refocus_after_lookup: Option<WindowRef>,
    failing_unhooks: usize,
}

/// Token for a fake subscription
#[derive(Debug)]
pub struct FakeHook(u64);

/// Cloneable handle to shared fake OS state
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<State>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a window; `module = None` models an exited/inaccessible process
    pub fn add_window(
        &self,
        window: WindowRef,
        process_id: u32,
        thread_id: u32,
        title: Option<&str>,
        module: Option<&str>,
    ) {
        let mut s = self.state.lock().unwrap();
        s.windows.insert(
            window,
            FakeWindow {
                owner: WindowOwner {
                    process_id,
                    thread_id,
                },
                title: title.map(str::to_string),
            },
        );
        match module {
            Some(m) => {
                s.processes.insert(process_id, m.to_string());
            }
            None => {
                s.processes.remove(&process_id);
            }
        }
    }

    pub fn kill_process(&self, process_id: u32) {
        self.state.lock().unwrap().processes.remove(&process_id);
    }

    pub fn focus(&self, window: WindowRef) {
        self.state.lock().unwrap().focused = Some(window);
    }

    pub fn refuse_install(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_install = refuse;
    }

    pub fn set_resolve_delay(&self, delay: Duration) {
        self.state.lock().unwrap().resolve_delay = delay;
    }

    /// Move focus to `window` right after the next process lookup
    pub fn refocus_after_lookup(&self, window: WindowRef) {
        self.state.lock().unwrap().refocus_after_lookup = Some(window);
    }

    /// Make the next `count` unsubscribes fail with the hook still registered
    pub fn fail_unhooks(&self, count: usize) {
        self.state.lock().unwrap().failing_unhooks = count;
    }

    /// Deliver one notification to every live sink on the calling thread
    pub fn fire(&self) -> usize {
        let (sinks, window) = {
            let s = self.state.lock().unwrap();
            let sinks: Vec<EventSink> = s.sinks.values().cloned().collect();
            (sinks, s.focused.unwrap_or(WindowRef(0)))
        };
        let event = RawFocusEvent {
            window,
            event_thread: 0,
            timestamp_ms: 0,
        };
        for sink in &sinks {
            sink(event);
        }
        sinks.len()
    }

    /// Focus `window` and deliver the notification
    pub fn switch_to(&self, window: WindowRef) -> usize {
        self.focus(window);
        self.fire()
    }

    pub fn active_hooks(&self) -> usize {
        self.state.lock().unwrap().sinks.len()
    }

    pub fn installs(&self) -> usize {
        self.state.lock().unwrap().installs
    }

    pub fn last_options(&self) -> Option<HookOptions> {
        self.state.lock().unwrap().last_options
    }

    /// Highest number of overlapping resolutions observed
    pub fn max_concurrent_resolves(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl FocusHost for FakeHost {
    type Hook = FakeHook;

    fn subscribe(&self, options: HookOptions, sink: EventSink) -> Result<FakeHook, WatcherError> {
        let mut s = self.state.lock().unwrap();
        if s.refuse_install {
            return Err(WatcherError::HookInstall);
        }
        s.next_hook += 1;
        let id = s.next_hook;
        s.sinks.insert(id, sink);
        s.installs += 1;
        s.last_options = Some(options);
        Ok(FakeHook(id))
    }

    fn unsubscribe(&self, hook: FakeHook) -> Result<(), UnhookFailure<FakeHook>> {
        let mut s = self.state.lock().unwrap();
        if s.failing_unhooks > 0 {
            s.failing_unhooks -= 1;
            return Err(UnhookFailure {
                error: UnhookError::PostQuit(hook.0 as u32),
                hook: Some(hook),
            });
        }
        match s.sinks.remove(&hook.0) {
            Some(_) => Ok(()),
            None => Err(UnhookFailure {
                error: UnhookError::Unhook,
                hook: None,
            }),
        }
    }

    fn focused_window(&self) -> Option<WindowRef> {
        let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(n, Ordering::SeqCst);
        let (focused, delay) = {
            let s = self.state.lock().unwrap();
            (s.focused, s.resolve_delay)
        };
        if !delay.is_zero() {
            sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        focused
    }

    fn owning_process(&self, window: WindowRef) -> Option<WindowOwner> {
        let s = self.state.lock().unwrap();
        s.windows.get(&window).map(|w| w.owner)
    }

    fn window_title(&self, window: WindowRef) -> Option<String> {
        let s = self.state.lock().unwrap();
        s.windows.get(&window).and_then(|w| w.title.clone())
    }

    fn process_info(&self, process_id: u32) -> Result<ProcessInfo, LookupError> {
        let mut s = self.state.lock().unwrap();
        if let Some(window) = s.refocus_after_lookup.take() {
            s.focused = Some(window);
        }
        s.processes
            .get(&process_id)
            .map(ProcessInfo::from_image_path)
            .ok_or_else(|| LookupError {
                pid: process_id,
                reason: "process exited".to_string(),
            })
    }
}
