//! Host-side owner of one window's caches
//!
//! A session is what a top-level inspector window holds on to. It owns the
//! binding cache, the preview cache and the deferred task queue, and it is
//! the object the host calls around a reload boundary.

use std::sync::Arc;
use tracing::{debug, info};

use crate::binding::BindingHandle;
use crate::builder::BuilderRegistry;
use crate::cache::{BindingCache, BindingRequest, BindingSnapshot, CacheStats};
use crate::config::CacheConfig;
use crate::diagnostics::DiagnosticHandler;
use crate::errors::Result;
use crate::policy::DisposalPolicies;
use crate::preview::{PreviewCache, PreviewHandle, PreviewSnapshot, ProviderRegistry};
use crate::scheduler::{DeferredQueue, DeferredTask};

/// Everything a session needs to carry across a reload boundary
#[derive(Debug, Default)]
pub struct SessionSnapshot {
    pub bindings: BindingSnapshot,
    pub previews: PreviewSnapshot,
}

/// Work done by one [`Session::tick`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries dropped by the post-reload revalidation
    pub dropped_after_reload: usize,
    /// Entries removed by the periodic cleanup sweep
    pub swept: usize,
}

pub struct Session {
    config: Arc<CacheConfig>,
    bindings: BindingCache,
    previews: PreviewCache,
    deferred: DeferredQueue<DeferredTask>,
    ticks: u64,
}

impl Session {
    pub fn new(
        config: Arc<CacheConfig>,
        diagnostics: Arc<dyn DiagnosticHandler>,
        builders: BuilderRegistry,
        policies: DisposalPolicies,
        mut providers: ProviderRegistry,
    ) -> Self {
        let hasher = config.key_hasher();
        for provider in &config.disabled_providers {
            providers.disable(provider.clone());
        }

        Self {
            bindings: BindingCache::new(builders, policies, hasher, diagnostics.clone()),
            previews: PreviewCache::new(providers, hasher, diagnostics),
            deferred: DeferredQueue::new(),
            ticks: 0,
            config,
        }
    }

    /// Get or create a binding, see [`BindingCache::get_or_create`]
    pub fn request_binding(
        &mut self,
        handle: &mut Option<BindingHandle>,
        request: &BindingRequest,
    ) -> Result<BindingHandle> {
        self.bindings.get_or_create(handle, request)
    }

    pub fn release_binding(&mut self, handle: &mut Option<BindingHandle>, force_remove: bool) {
        self.bindings.dispose(handle, force_remove);
    }

    /// Ordered previews for a binding over its own target list
    pub fn previews_for(&mut self, binding: &BindingHandle, results: &mut Vec<PreviewHandle>) -> usize {
        self.previews.get_previews(binding, binding.targets(), results)
    }

    pub fn release_previews(&mut self, previews: &mut Vec<PreviewHandle>, force_remove: bool) {
        self.previews.dispose_all_in(previews, force_remove);
    }

    /// Host hook before the scripting layer is torn down
    ///
    /// Nothing is disposed; the snapshot just keeps the entries reachable.
    pub fn on_before_snapshot(&self) -> SessionSnapshot {
        let snapshot = SessionSnapshot {
            bindings: self.bindings.snapshot(),
            previews: self.previews.snapshot(),
        };
        info!(
            "Captured {} binding(s) and {} preview(s) for reload",
            snapshot.bindings.len(),
            snapshot.previews.len()
        );
        snapshot
    }

    /// Host hook once the scripting layer has been rebuilt
    ///
    /// Entries are rehydrated unvalidated; validation runs on the next
    /// [`tick`](Self::tick).
    pub fn on_after_restore(&mut self, snapshot: SessionSnapshot) {
        self.bindings.restore(snapshot.bindings);
        self.previews.restore(snapshot.previews);
        self.deferred.schedule_once(DeferredTask::RevalidateAfterReload);
    }

    /// Run at the start of each host frame, before anything is drawn
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport::default();

        for task in self.deferred.take_ready() {
            match task {
                DeferredTask::RevalidateAfterReload => {
                    report.dropped_after_reload += self.bindings.revalidate_after_reload();
                    report.dropped_after_reload += self.previews.revalidate_after_reload();
                }
            }
        }

        let interval = u64::from(self.config.cache_options.cleanup_interval_ticks);
        if interval > 0 && self.ticks % interval == 0 {
            report.swept += self.bindings.clean_up();
            report.swept += self.previews.clean_up();
            debug!("Periodic cleanup at tick {} removed {} entries", self.ticks, report.swept);
        }

        report
    }

    /// Sweep both caches now
    pub fn clean_up(&mut self) -> usize {
        self.bindings.clean_up() + self.previews.clean_up()
    }

    pub fn is_reloading(&self) -> bool {
        self.bindings.is_reloading() || self.previews.is_reloading()
    }

    /// Force-dispose everything; the session is empty afterwards
    pub fn close(&mut self) {
        self.previews.dispose_all();
        self.bindings.dispose_all();
        info!("Session closed after {} tick(s)", self.ticks);
    }

    /// Combined counters of both caches
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.bindings.stats();
        stats += self.previews.stats();
        stats
    }

    pub fn bindings(&self) -> &BindingCache {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingCache {
        &mut self.bindings
    }

    pub fn previews(&self) -> &PreviewCache {
        &self.previews
    }

    pub fn previews_mut(&mut self) -> &mut PreviewCache {
        &mut self.previews
    }

    pub fn config(&self) -> &Arc<CacheConfig> {
        &self.config
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn has_pending_revalidation(&self) -> bool {
        self.deferred.is_pending(&DeferredTask::RevalidateAfterReload)
    }
}
