//! Watcher façade: enable/disable state machine, cached snapshot, subscribers
//!
//! Raw notifications arrive on the host's delivery thread. Each one is
//! handled under the control lock: generation/state check, resolve, snapshot
//! swap, subscriber notification. `disable` takes the same lock before it
//! returns, so a notification either completes before `disable` returns or is
//! discarded.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::thread::{self, ThreadId};

use tracing::{debug, error, info, trace, warn};

use crate::config::WatcherConfig;
use crate::error::{ResolveError, WatcherError};
use crate::hook::HookManager;
use crate::host::{EventSink, FocusHost, HookOptions, RawFocusEvent};
use crate::resolver::FocusStateResolver;
use crate::snapshot::{FocusSnapshot, ProcessInfo};

/// Hook subscription state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubscriptionState {
    #[default]
    Disabled,
    Enabled,
}

/// Handle returned by [`Watcher::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Subscriber {
    Callback(Arc<dyn Fn(&FocusSnapshot) + Send + Sync>),
    Channel(Sender<Arc<FocusSnapshot>>),
}

struct Control<H: FocusHost> {
    state: SubscriptionState,
    hooks: HookManager<H>,
}

struct Shared<H: FocusHost> {
    host: H,
    resolver: FocusStateResolver,
    control: Mutex<Control<H>>,
    snapshot: RwLock<Arc<FocusSnapshot>>,
    /// Lock-free mirror of `control.state`
    enabled: AtomicBool,
    raise_events: AtomicBool,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
    /// Thread currently running subscriber callbacks
    dispatch_thread: Mutex<Option<ThreadId>>,
    /// `disable` called from inside a subscriber callback
    disable_requested: AtomicBool,
}

/// Clears `dispatch_thread` when notification ends, panics included
struct DispatchGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<H: FocusHost> Shared<H> {
    fn in_dispatch(&self) -> bool {
        *lock(&self.dispatch_thread) == Some(thread::current().id())
    }

    fn snapshot(&self) -> Arc<FocusSnapshot> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Resolve and publish a new snapshot. Caller holds the control lock.
    fn refresh(&self) -> Arc<FocusSnapshot> {
        let next = match self.resolver.resolve(&self.host) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                match e {
                    ResolveError::NoForegroundWindow => debug!("Focus resolve: {e}"),
                    _ => warn!("Focus resolve failed: {e}"),
                }
                self.resolver.fallback(&self.snapshot(), &e)
            }
        };

        let next = Arc::new(next);
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        next
    }

    fn on_event(&self, generation: u64, event: RawFocusEvent) {
        let mut control = lock(&self.control);
        if control.state != SubscriptionState::Enabled || control.hooks.generation() != generation
        {
            trace!(generation, "Stale focus event discarded");
            return;
        }
        trace!(window = ?event.window, thread = event.event_thread, "Foreground changed");

        let snapshot = self.refresh();
        debug!(
            pid = snapshot.process_id,
            tid = snapshot.thread_id,
            module = snapshot.module_name().unwrap_or("?"),
            title = snapshot.window_title().unwrap_or(""),
            "Focus changed"
        );

        if self.raise_events.load(Ordering::SeqCst) {
            self.notify(&snapshot);
        }

        // Deferred disable requested by a subscriber
        if self.disable_requested.swap(false, Ordering::SeqCst) {
            control.state = SubscriptionState::Disabled;
            let hooks: Vec<H::Hook> = control.hooks.detach().into_iter().collect();
            drop(control);
            self.release_all(hooks);
            info!("Focus watcher disabled");
        }
    }

    /// Unregister detached hooks with the control lock released. Hooks the
    /// host could not remove go back to the manager for the next `disable`.
    fn release_all(&self, hooks: Vec<H::Hook>) {
        let live: Vec<H::Hook> = hooks
            .into_iter()
            .filter_map(|hook| HookManager::release(&self.host, hook))
            .collect();
        if live.is_empty() {
            return;
        }
        let mut control = lock(&self.control);
        for hook in live {
            control.hooks.strand(hook);
        }
        warn!(stranded = control.hooks.stranded(), "Focus hook still registered");
    }

    fn notify(&self, snapshot: &Arc<FocusSnapshot>) {
        *lock(&self.dispatch_thread) = Some(thread::current().id());
        let _guard = DispatchGuard(&self.dispatch_thread);

        let callbacks: Vec<(SubscriptionId, Arc<dyn Fn(&FocusSnapshot) + Send + Sync>)> = {
            let mut subs = lock(&self.subscribers);
            // Channel subscribers are delivered here; closed ones are dropped
            subs.retain(|(_, sub)| match sub {
                Subscriber::Channel(tx) => tx.send(Arc::clone(snapshot)).is_ok(),
                Subscriber::Callback(_) => true,
            });
            subs.iter()
                .filter_map(|(id, sub)| match sub {
                    Subscriber::Callback(f) => Some((*id, Arc::clone(f))),
                    Subscriber::Channel(_) => None,
                })
                .collect()
        };

        for (id, callback) in callbacks {
            if self.disable_requested.load(Ordering::SeqCst) {
                break;
            }
            if catch_unwind(AssertUnwindSafe(|| callback(&**snapshot))).is_err() {
                error!(subscription = id.0, "Focus subscriber panicked");
            }
        }
    }
}

fn sink_for<H: FocusHost>(shared: Weak<Shared<H>>, generation: u64) -> EventSink {
    Arc::new(move |event: RawFocusEvent| {
        if let Some(shared) = shared.upgrade() {
            shared.on_event(generation, event);
        }
    })
}

/// Observes the system-wide foreground window.
///
/// While enabled, every foreground change re-resolves the owning process and
/// thread, replaces the cached [`FocusSnapshot`], and (if raising events)
/// notifies subscribers with it. Accessors keep returning the last snapshot
/// after `disable`. Dropping the watcher removes the OS hook.
pub struct Watcher<H: FocusHost> {
    shared: Arc<Shared<H>>,
}

impl<H: FocusHost> Watcher<H> {
    /// Create a disabled watcher with default settings
    pub fn new(host: H) -> Self {
        Self::with_config(host, &WatcherConfig::default())
    }

    /// Create a disabled watcher from persisted settings
    pub fn with_config(host: H, config: &WatcherConfig) -> Self {
        let options = HookOptions {
            skip_own_process: config.skip_own_process,
        };
        Self {
            shared: Arc::new(Shared {
                host,
                resolver: FocusStateResolver,
                control: Mutex::new(Control {
                    state: SubscriptionState::Disabled,
                    hooks: HookManager::new(options),
                }),
                snapshot: RwLock::new(Arc::new(FocusSnapshot::default())),
                enabled: AtomicBool::new(false),
                raise_events: AtomicBool::new(config.raise_events),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
                dispatch_thread: Mutex::new(None),
                disable_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Install the hook and seed the snapshot. No-op if already enabled.
    ///
    /// Fails only if the OS refuses the hook; the watcher then stays disabled
    /// and no snapshot is seeded.
    pub fn enable(&self) -> Result<(), WatcherError> {
        let shared = &self.shared;
        if shared.in_dispatch() {
            // Called from a subscriber: the hook is still live, cancel any
            // pending disable
            shared.disable_requested.store(false, Ordering::SeqCst);
            shared.enabled.store(true, Ordering::SeqCst);
            return Ok(());
        }

        let mut control = lock(&shared.control);
        if control.state == SubscriptionState::Enabled {
            return Ok(());
        }

        let weak = Arc::downgrade(shared);
        let generation = control
            .hooks
            .install(&shared.host, |generation| sink_for(weak, generation))?;

        let snapshot = shared.refresh();
        control.state = SubscriptionState::Enabled;
        shared.enabled.store(true, Ordering::SeqCst);

        info!(
            generation,
            pid = snapshot.process_id,
            module = snapshot.module_name().unwrap_or("?"),
            "Focus watcher enabled"
        );
        Ok(())
    }

    /// Remove the hook. No-op if already disabled and no earlier unhook
    /// is awaiting retry.
    ///
    /// Once this returns no further notification is delivered. The last
    /// snapshot stays readable. A hook the OS failed to remove is kept and
    /// retried by the next `disable` (or drop).
    ///
    /// Called from inside a subscriber, `is_enabled()` turns `false` at once
    /// but the hook is only removed when the current notification returns.
    /// Remaining subscribers of that notification are skipped.
    pub fn disable(&self) {
        let shared = &self.shared;
        if shared.in_dispatch() {
            if shared.enabled.swap(false, Ordering::SeqCst) {
                shared.disable_requested.store(true, Ordering::SeqCst);
            }
            return;
        }

        let (hooks, was_enabled) = {
            let mut control = lock(&shared.control);
            let mut hooks = control.hooks.take_stranded();
            let was_enabled = control.state == SubscriptionState::Enabled;
            if was_enabled {
                control.state = SubscriptionState::Disabled;
                shared.enabled.store(false, Ordering::SeqCst);
                hooks.extend(control.hooks.detach());
            }
            (hooks, was_enabled)
        };

        // Released outside the lock: the host may wait for its delivery
        // thread, which may be blocked on that lock
        shared.release_all(hooks);
        if was_enabled {
            info!("Focus watcher disabled");
        }
    }

    /// `enable` for `true`, `disable` for `false`
    pub fn set_enabled(&self, enabled: bool) -> Result<(), WatcherError> {
        if enabled {
            self.enable()
        } else {
            self.disable();
            Ok(())
        }
    }

    /// Whether the watcher is enabled; `false` as soon as a subscriber
    /// requests `disable`, before its hook is removed
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Subscription state, as reported by [`Watcher::is_enabled`]
    pub fn state(&self) -> SubscriptionState {
        if self.is_enabled() {
            SubscriptionState::Enabled
        } else {
            SubscriptionState::Disabled
        }
    }

    /// Whether subscribers are notified on change (default `true`)
    pub fn enable_raising_events(&self) -> bool {
        self.shared.raise_events.load(Ordering::SeqCst)
    }

    /// Gate notification delivery. The snapshot keeps updating either way;
    /// changes missed while `false` are not replayed.
    pub fn set_enable_raising_events(&self, raise: bool) {
        self.shared.raise_events.store(raise, Ordering::SeqCst);
    }

    /// Last resolved snapshot, complete and immutable
    pub fn snapshot(&self) -> Arc<FocusSnapshot> {
        self.shared.snapshot()
    }

    /// Owning process id of the focused window (0 before the first resolve)
    pub fn process_id(&self) -> u32 {
        self.snapshot().process_id
    }

    /// Owning thread id of the focused window
    pub fn thread_id(&self) -> u32 {
        self.snapshot().thread_id
    }

    /// Focused window caption, if readable
    pub fn window_title(&self) -> Option<String> {
        self.snapshot().window_title.clone()
    }

    /// Executable name of the owning process, e.g. `editor.exe`
    pub fn module_name(&self) -> Option<String> {
        self.snapshot().module_name().map(str::to_string)
    }

    /// Process metadata of the owner, `None` if the lookup failed
    pub fn process(&self) -> Option<ProcessInfo> {
        self.snapshot().process.clone()
    }

    /// Register a change callback.
    ///
    /// Runs on the host's delivery thread with the new snapshot. It may call
    /// back into the watcher, including `disable`.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&FocusSnapshot) + Send + Sync + 'static,
    {
        self.add_subscriber(Subscriber::Callback(Arc::new(callback)))
    }

    /// Channel of change snapshots, for hosts running their own event loop.
    /// Dropping the receiver unsubscribes.
    pub fn changes(&self) -> Receiver<Arc<FocusSnapshot>> {
        let (tx, rx) = mpsc::channel();
        self.add_subscriber(Subscriber::Channel(tx));
        rx
    }

    /// Remove a subscriber; `false` if unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = lock(&self.shared.subscribers);
        let before = subs.len();
        subs.retain(|(sub_id, _)| *sub_id != id);
        subs.len() != before
    }

    fn add_subscriber(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::SeqCst));
        lock(&self.shared.subscribers).push((id, subscriber));
        id
    }
}

impl<H: FocusHost> Drop for Watcher<H> {
    fn drop(&mut self) {
        self.disable();
        // A subscriber dropping the last handle already holds the control lock
        if self.shared.in_dispatch() {
            return;
        }
        let stranded = lock(&self.shared.control).hooks.stranded();
        if stranded > 0 {
            error!(stranded, "Focus hook leaked on drop");
        }
    }
}
