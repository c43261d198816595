//! Hook lifecycle: one OS subscription per enabled period

use tracing::{debug, warn};

use crate::error::{UnhookFailure, WatcherError};
use crate::host::{EventSink, FocusHost, HookOptions};

/// Owns the live hook token. `Some` iff the watcher is enabled.
pub struct HookManager<H: FocusHost> {
    options: HookOptions,
    hook: Option<H::Hook>,
    /// Detached hooks whose unsubscribe failed, awaiting another attempt
    stranded: Vec<H::Hook>,
    generation: u64,
}

impl<H: FocusHost> HookManager<H> {
    pub fn new(options: HookOptions) -> Self {
        Self {
            options,
            hook: None,
            stranded: Vec::new(),
            generation: 0,
        }
    }

    /// Install the foreground hook, routing events to the sink built for the
    /// new generation. Returns that generation.
    ///
    /// An already installed hook is removed first. Stranded hooks are left
    /// for the next `uninstall`.
    pub fn install<F>(&mut self, host: &H, make_sink: F) -> Result<u64, WatcherError>
    where
        F: FnOnce(u64) -> EventSink,
    {
        if let Some(hook) = self.detach()
            && let Some(hook) = Self::release(host, hook)
        {
            self.strand(hook);
        }

        let generation = self.generation + 1;
        let hook = host.subscribe(self.options, make_sink(generation))?;
        self.generation = generation;
        self.hook = Some(hook);
        debug!(generation, "Focus hook installed");
        Ok(generation)
    }

    /// Remove the hook and retry stranded ones (no-op if none)
    pub fn uninstall(&mut self, host: &H) {
        let mut pending = self.take_stranded();
        pending.extend(self.detach());
        for hook in pending {
            if let Some(hook) = Self::release(host, hook) {
                self.strand(hook);
            }
        }
    }

    /// Take the hook out without unregistering it, for release outside a lock
    pub fn detach(&mut self) -> Option<H::Hook> {
        self.hook.take()
    }

    /// Unregister a detached hook. A hook the host could not remove is
    /// handed back and must be stranded, not dropped.
    pub fn release(host: &H, hook: H::Hook) -> Option<H::Hook> {
        match host.unsubscribe(hook) {
            Ok(()) => {
                debug!("Focus hook removed");
                None
            }
            Err(UnhookFailure { error, hook }) => {
                warn!(retained = hook.is_some(), "Focus unhook error: {error}");
                hook
            }
        }
    }

    /// Keep a still-registered hook for a later retry
    pub fn strand(&mut self, hook: H::Hook) {
        self.stranded.push(hook);
    }

    /// Take stranded hooks out for release outside a lock
    pub fn take_stranded(&mut self) -> Vec<H::Hook> {
        std::mem::take(&mut self.stranded)
    }

    /// Number of hooks awaiting another unsubscribe attempt
    pub fn stranded(&self) -> usize {
        self.stranded.len()
    }

    pub fn is_installed(&self) -> bool {
        self.hook.is_some()
    }

    /// Generation of the current (or last) enabled period
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
