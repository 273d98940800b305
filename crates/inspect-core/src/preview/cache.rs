use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::binding::BindingHandle;
use crate::cache::{CacheSnapshot, CacheStats, SwapBuffer};
use crate::diagnostics::DiagnosticHandler;
use crate::errors::CacheError;
use crate::identity::{KeyHasher, PreviewableKey};
use crate::target::TargetRef;

use super::{PreviewHandle, PreviewProvider, PreviewWrapper, ProviderRegistry};

/// Snapshot of a preview cache taken before a reload
pub type PreviewSnapshot = CacheSnapshot<PreviewableKey, PreviewHandle>;

/// Owner of provider preview wrappers
///
/// Mirrors [`BindingCache`](crate::cache::BindingCache): one wrapper per key,
/// validated before reuse, swept with the same swap-buffer pass.
pub struct PreviewCache {
    entries: SwapBuffer<PreviewableKey, PreviewHandle>,
    registry: ProviderRegistry,
    hasher: KeyHasher,
    diagnostics: Arc<dyn DiagnosticHandler>,
    reloading: bool,
    stats: CacheStats,
}

impl PreviewCache {
    pub fn new(
        registry: ProviderRegistry,
        hasher: KeyHasher,
        diagnostics: Arc<dyn DiagnosticHandler>,
    ) -> Self {
        Self {
            entries: SwapBuffer::new(),
            registry,
            hasher,
            diagnostics,
            reloading: false,
            stats: CacheStats::default(),
        }
    }

    /// Append the ordered preview list for `binding` over `targets`
    ///
    /// The wrapper around `binding` always comes first, followed by one
    /// wrapper per provider registered for the type of `targets[0]`. A
    /// provider that fails is reported and skipped. Returns the number of
    /// wrappers appended.
    pub fn get_previews(
        &mut self,
        binding: &BindingHandle,
        targets: &[Option<TargetRef>],
        results: &mut Vec<PreviewHandle>,
    ) -> usize {
        let before = results.len();
        results.push(Rc::new(PreviewWrapper::for_binding(binding.clone())));

        let Some(first) = targets.first().and_then(Option::as_ref) else {
            return results.len() - before;
        };

        let providers: Vec<Rc<dyn PreviewProvider>> =
            self.registry.providers_for(first.type_name()).to_vec();
        if providers.is_empty() {
            return results.len() - before;
        }

        let target_key = self.hasher.key_for_targets(targets, false);
        for provider in providers {
            let key = PreviewableKey::new(provider.provider_type(), target_key);
            if let Some(wrapper) = self.get_or_create(key, provider.as_ref(), targets) {
                results.push(wrapper);
            }
        }

        results.len() - before
    }

    fn get_or_create(
        &mut self,
        key: PreviewableKey,
        provider: &dyn PreviewProvider,
        targets: &[Option<TargetRef>],
    ) -> Option<PreviewHandle> {
        if let Some(cached) = self.entries.get(&key).cloned() {
            if cached.is_valid() {
                debug!("Preview hit for {}", key);
                self.stats.hits += 1;
                cached.activate();
                return Some(cached);
            }

            debug!("Evicting stale preview {}", key);
            self.stats.stale_evictions += 1;
            self.evict_and_teardown(&cached);
        }

        self.stats.misses += 1;
        match provider.create(targets) {
            Ok(state) => {
                self.stats.constructed += 1;
                let wrapper = Rc::new(PreviewWrapper::for_provider(key, targets.to_vec(), state));
                self.entries.insert(key, wrapper.clone());
                Some(wrapper)
            }
            Err(source) => {
                self.stats.construction_failures += 1;
                let err = CacheError::ProviderFailed {
                    provider: provider.provider_type(),
                    source,
                };
                warn!("{}", err);
                self.diagnostics.error(Some(key.targets), &err.to_string());
                None
            }
        }
    }

    /// Release a preview handle; same rules as
    /// [`BindingCache::dispose`](crate::cache::BindingCache::dispose)
    pub fn dispose(&mut self, handle: &mut Option<PreviewHandle>, force_remove: bool) {
        let Some(wrapper) = handle.take() else {
            return;
        };

        if !force_remove && !self.reloading && self.is_cached(&wrapper) && wrapper.is_valid() {
            self.stats.soft_releases += 1;
            return;
        }

        self.evict_and_teardown(&wrapper);
    }

    /// Release every handle in a preview list
    pub fn dispose_all_in(&mut self, previews: &mut Vec<PreviewHandle>, force_remove: bool) {
        for wrapper in previews.drain(..) {
            self.dispose(&mut Some(wrapper), force_remove);
        }
    }

    pub fn validate(&self, wrapper: &PreviewWrapper) -> bool {
        wrapper.is_valid()
    }

    fn is_cached(&self, wrapper: &PreviewHandle) -> bool {
        wrapper
            .key()
            .and_then(|key| self.entries.get(&key))
            .is_some_and(|cached| Rc::ptr_eq(cached, wrapper))
    }

    fn evict_and_teardown(&mut self, wrapper: &PreviewHandle) {
        if self.is_cached(wrapper) {
            if let Some(key) = wrapper.key() {
                self.entries.remove(&key);
            }
        }
        self.teardown(wrapper);
    }

    fn teardown(&mut self, wrapper: &PreviewWrapper) {
        match wrapper.teardown() {
            None => {}
            Some(Ok(())) => self.stats.disposed += 1,
            Some(Err(err)) => {
                self.stats.disposed += 1;
                self.stats.disposal_faults += 1;
                let message = format!(
                    "teardown of '{}' preview failed: {:#}",
                    wrapper.provider_type(),
                    err
                );
                warn!("{}", message);
                self.diagnostics
                    .warning(wrapper.key().map(|key| key.targets), &message);
            }
        }
    }

    /// Sweep the cache, tearing down every wrapper that no longer validates
    pub fn clean_up(&mut self) -> usize {
        let rejected = self.entries.sweep(|_, wrapper| wrapper.is_valid());
        let removed = rejected.len();

        for (key, wrapper) in rejected {
            debug!("Sweeping preview {}", key);
            self.teardown(&wrapper);
        }

        self.stats.swept += removed as u64;
        removed
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        self.entries
            .iter()
            .map(|(key, wrapper)| (*key, Some(wrapper.clone())))
            .collect()
    }

    /// Rehydrate entries after a reload boundary, without validating them
    pub fn restore(&mut self, snapshot: PreviewSnapshot) {
        let total = snapshot.len();
        let mut restored = 0;

        for (key, handle) in snapshot.into_entries() {
            let Some(wrapper) = handle else {
                self.stats.dropped_after_reload += 1;
                continue;
            };
            restored += 1;
            if let Some(displaced) = self.entries.insert(key, wrapper.clone()) {
                if !Rc::ptr_eq(&displaced, &wrapper) {
                    self.teardown(&displaced);
                }
            }
        }

        self.reloading = true;
        info!("Restored {} of {} cached preview(s)", restored, total);
    }

    /// Deferred pass after a reload: drop, without teardown, every wrapper
    /// that did not survive
    pub fn revalidate_after_reload(&mut self) -> usize {
        let dropped = self.entries.sweep(|_, wrapper| wrapper.is_valid()).len();
        self.reloading = false;
        self.stats.dropped_after_reload += dropped as u64;

        if dropped > 0 {
            info!("Dropped {} preview(s) that did not survive the reload", dropped);
        }
        dropped
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// Force-dispose every cached wrapper
    pub fn dispose_all(&mut self) {
        for (_, wrapper) in self.entries.take_all() {
            self.teardown(&wrapper);
        }
    }

    pub fn get(&self, key: &PreviewableKey) -> Option<&PreviewHandle> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &PreviewableKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProviderRegistry {
        &mut self.registry
    }
}
