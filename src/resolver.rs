//! Focus state resolution: foreground window → owner ids → process metadata

use tracing::trace;

use crate::error::ResolveError;
use crate::host::FocusHost;
use crate::snapshot::FocusSnapshot;

/// Stateless resolver. Each call is a fresh, blocking query of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusStateResolver;

impl FocusStateResolver {
    /// Resolve the current foreground window into a snapshot
    pub fn resolve<H: FocusHost>(&self, host: &H) -> Result<FocusSnapshot, ResolveError> {
        let window = host
            .focused_window()
            .ok_or(ResolveError::NoForegroundWindow)?;
        let owner = host
            .owning_process(window)
            .ok_or(ResolveError::WindowGone)?;
        let window_title = host.window_title(window);
        let process = host
            .process_info(owner.process_id)
            .map_err(|e| ResolveError::ProcessLookup {
                pid: e.pid,
                thread_id: owner.thread_id,
                window,
                reason: e.reason,
            })?;

        trace!(
            pid = owner.process_id,
            tid = owner.thread_id,
            module = %process.module_name,
            "resolved"
        );

        Ok(FocusSnapshot {
            process_id: owner.process_id,
            thread_id: owner.thread_id,
            window: Some(window),
            window_title,
            process: Some(process),
        })
    }

    /// Snapshot to publish when resolution failed.
    ///
    /// Prior ids are kept, title and module are marked unavailable. If the
    /// owner was found but the process lookup failed, the owner ids and
    /// window carried by the error replace the prior ones.
    pub fn fallback(&self, prior: &FocusSnapshot, err: &ResolveError) -> FocusSnapshot {
        let mut next = FocusSnapshot {
            window_title: None,
            process: None,
            ..prior.clone()
        };

        if let ResolveError::ProcessLookup {
            pid,
            thread_id,
            window,
            ..
        } = err
        {
            next.process_id = *pid;
            next.thread_id = *thread_id;
            next.window = Some(*window);
        }

        next
    }
}
