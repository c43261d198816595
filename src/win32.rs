//! Win32 backend: foreground hook via SetWinEventHook on a dedicated thread
//!
//! `WINEVENT_OUTOFCONTEXT` callbacks are delivered through the message queue
//! of the thread that installed the hook, and `UnhookWinEvent` must run on
//! that same thread. Each subscription therefore gets its own `focus-hook`
//! thread: it installs the hook, pumps messages until `WM_QUIT`, then unhooks.

use std::cell::RefCell;
use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, trace};
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::{
    GetCurrentThreadId, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
    QueryFullProcessImageNameW,
};
use windows::Win32::UI::Accessibility::{HWINEVENTHOOK, SetWinEventHook, UnhookWinEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetForegroundWindow, GetMessageW, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, MSG, PM_NOREMOVE, PeekMessageW, PostThreadMessageW,
    TranslateMessage, WM_QUIT,
};
use windows::core::PWSTR;

use crate::error::{LookupError, UnhookError, UnhookFailure, WatcherError};
use crate::host::{EventSink, FocusHost, HookOptions, RawFocusEvent, WindowOwner, WindowRef};
use crate::snapshot::ProcessInfo;

// Win32 constants (not exported by windows-rs feature)
const EVENT_SYSTEM_FOREGROUND: u32 = 0x0003;
const WINEVENT_OUTOFCONTEXT: u32 = 0x0000;
const WINEVENT_SKIPOWNPROCESS: u32 = 0x0002;

/// Long-path capacity for QueryFullProcessImageNameW
const IMAGE_PATH_CAPACITY: usize = 1024;

/// PostThreadMessageW fails while the target queue is full
const POST_QUIT_ATTEMPTS: u32 = 3;
const POST_QUIT_BACKOFF: Duration = Duration::from_millis(10);

thread_local! {
    /// Sink of the hook installed on this thread
    static SINK: RefCell<Option<EventSink>> = const { RefCell::new(None) };
}

/// Live hook: the thread owning it
#[derive(Debug)]
pub struct Win32Hook {
    thread_id: u32,
    thread: Option<JoinHandle<()>>,
}

/// Foreground-window host backed by user32/kernel32
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Host;

impl Win32Host {
    pub fn new() -> Self {
        Self
    }
}

impl FocusHost for Win32Host {
    type Hook = Win32Hook;

    fn subscribe(&self, options: HookOptions, sink: EventSink) -> Result<Win32Hook, WatcherError> {
        let mut flags = WINEVENT_OUTOFCONTEXT;
        if options.skip_own_process {
            flags |= WINEVENT_SKIPOWNPROCESS;
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("focus-hook".to_string())
            .spawn(move || run_hook_thread(flags, sink, ready_tx))?;

        match ready_rx.recv() {
            Ok(Some(thread_id)) => Ok(Win32Hook {
                thread_id,
                thread: Some(handle),
            }),
            _ => {
                let _ = handle.join();
                Err(WatcherError::HookInstall)
            }
        }
    }

    fn unsubscribe(&self, mut hook: Win32Hook) -> Result<(), UnhookFailure<Win32Hook>> {
        if !post_quit(hook.thread_id) {
            // Hook thread still pumping: hand the hook back for a later retry
            return Err(UnhookFailure {
                error: UnhookError::PostQuit(hook.thread_id),
                hook: Some(hook),
            });
        }

        let Some(handle) = hook.thread.take() else {
            return Ok(());
        };
        // Called from inside a callback: the loop exits once it returns
        if handle.thread().id() == thread::current().id() {
            return Ok(());
        }
        handle.join().map_err(|_| UnhookFailure {
            error: UnhookError::Unhook,
            hook: None,
        })
    }

    fn focused_window(&self) -> Option<WindowRef> {
        let hwnd = unsafe { GetForegroundWindow() };
        (hwnd != HWND::default()).then_some(WindowRef(hwnd.0 as usize))
    }

    fn owning_process(&self, window: WindowRef) -> Option<WindowOwner> {
        let mut process_id = 0u32;
        let thread_id = unsafe { GetWindowThreadProcessId(to_hwnd(window), Some(&mut process_id)) };
        (thread_id != 0).then_some(WindowOwner {
            process_id,
            thread_id,
        })
    }

    fn window_title(&self, window: WindowRef) -> Option<String> {
        let hwnd = to_hwnd(window);
        unsafe {
            let len = GetWindowTextLengthW(hwnd);
            if len == 0 {
                return None;
            }

            let mut buf = vec![0u16; (len + 1) as usize];
            let copied = GetWindowTextW(hwnd, &mut buf);
            if copied == 0 {
                return None;
            }

            Some(String::from_utf16_lossy(&buf[..copied as usize]))
        }
    }

    fn process_info(&self, process_id: u32) -> Result<ProcessInfo, LookupError> {
        let lookup_err = |e: windows::core::Error| LookupError {
            pid: process_id,
            reason: e.message(),
        };

        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, process_id)
                .map_err(lookup_err)?;

            let mut path = [0u16; IMAGE_PATH_CAPACITY];
            let mut size = path.len() as u32;
            let queried = QueryFullProcessImageNameW(
                handle,
                Default::default(),
                PWSTR(path.as_mut_ptr()),
                &mut size,
            );
            let _ = CloseHandle(handle);
            queried.map_err(lookup_err)?;

            Ok(ProcessInfo::from_image_path(String::from_utf16_lossy(
                &path[..size as usize],
            )))
        }
    }
}

fn to_hwnd(window: WindowRef) -> HWND {
    HWND(window.0 as *mut c_void)
}

/// Hook thread body: install, report, pump, unhook
fn run_hook_thread(flags: u32, sink: EventSink, ready: mpsc::Sender<Option<u32>>) {
    SINK.with(|s| *s.borrow_mut() = Some(sink));

    let mut msg = MSG::default();
    unsafe {
        // Create the message queue before anyone can post WM_QUIT to it
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
    }

    let hook = unsafe {
        SetWinEventHook(
            EVENT_SYSTEM_FOREGROUND,
            EVENT_SYSTEM_FOREGROUND,
            None,
            Some(win_event_proc),
            0,
            0,
            flags,
        )
    };

    if hook.is_invalid() {
        SINK.with(|s| s.borrow_mut().take());
        let _ = ready.send(None);
        return;
    }
    let _ = ready.send(Some(unsafe { GetCurrentThreadId() }));
    trace!(?hook, "Foreground hook thread running");

    loop {
        let ret = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        // 0 = WM_QUIT, -1 = error
        if ret.0 <= 0 {
            break;
        }
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    if !unsafe { UnhookWinEvent(hook) }.as_bool() {
        error!(?hook, "UnhookWinEvent failed");
    }
    SINK.with(|s| s.borrow_mut().take());
    trace!("Foreground hook thread exited");
}

/// Win event callback: fired when the foreground window changes
unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    _event: u32,
    hwnd: HWND,
    _id_object: i32,
    _id_child: i32,
    id_event_thread: u32,
    dwms_event_time: u32,
) {
    let event = RawFocusEvent {
        window: WindowRef(hwnd.0 as usize),
        event_thread: id_event_thread,
        timestamp_ms: dwms_event_time,
    };

    // Never unwind across the FFI boundary
    let result = catch_unwind(AssertUnwindSafe(|| {
        let sink = SINK.with(|s| s.borrow().clone());
        if let Some(sink) = sink {
            sink(event);
        }
    }));

    if result.is_err() {
        error!("Panic in foreground hook callback");
    }
}

/// Ask the hook thread to leave its message loop, retrying a few times
fn post_quit(thread_id: u32) -> bool {
    for attempt in 1..=POST_QUIT_ATTEMPTS {
        match unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            Ok(()) => return true,
            Err(e) => {
                debug!(thread_id, attempt, "PostThreadMessage(WM_QUIT) failed: {e}");
                if attempt < POST_QUIT_ATTEMPTS {
                    thread::sleep(POST_QUIT_BACKOFF);
                }
            }
        }
    }
    false
}
