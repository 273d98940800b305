use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::binding::{Binding, BindingContext, BindingHandle};
use crate::builder::BuilderRegistry;
use crate::diagnostics::DiagnosticHandler;
use crate::errors::{CacheError, Result};
use crate::identity::{IdentityKey, KeyHasher};
use crate::policy::{DisposalPolicies, DisposalPolicy};
use crate::target::{all_alive, TargetRef};

use super::{CacheSnapshot, CacheStats, DisposalWalk, SwapBuffer};

/// Snapshot of a binding cache taken before a reload
pub type BindingSnapshot = CacheSnapshot<IdentityKey, BindingHandle>;

/// What a caller wants a binding for
#[derive(Clone, Default)]
pub struct BindingRequest {
    pub targets: Vec<Option<TargetRef>>,
    pub variant: bool,
    /// Explicit builder kind; overrides capability discovery
    pub kind: Option<String>,
    pub context: Option<BindingContext>,
    /// Insert the new binding into the cache (default: true)
    pub cache: bool,
}

impl BindingRequest {
    pub fn new(targets: Vec<Option<TargetRef>>) -> Self {
        Self {
            targets,
            variant: false,
            kind: None,
            context: None,
            cache: true,
        }
    }

    /// Request for a single target
    pub fn single(target: TargetRef) -> Self {
        Self::new(vec![Some(target)])
    }

    pub fn variant(mut self, variant: bool) -> Self {
        self.variant = variant;
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn context(mut self, context: BindingContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn uncached(mut self) -> Self {
        self.cache = false;
        self
    }
}

/// Sole owner of cached bindings
///
/// At most one binding is cached per key, and every binding handed out has
/// passed validation. Callers hold handles and give them back through
/// [`dispose`](Self::dispose).
pub struct BindingCache {
    entries: SwapBuffer<IdentityKey, BindingHandle>,
    builders: BuilderRegistry,
    policies: DisposalPolicies,
    hasher: KeyHasher,
    diagnostics: Arc<dyn DiagnosticHandler>,
    reloading: bool,
    stats: CacheStats,
}

impl BindingCache {
    pub fn new(
        builders: BuilderRegistry,
        policies: DisposalPolicies,
        hasher: KeyHasher,
        diagnostics: Arc<dyn DiagnosticHandler>,
    ) -> Self {
        Self {
            entries: SwapBuffer::new(),
            builders,
            policies,
            hasher,
            diagnostics,
            reloading: false,
            stats: CacheStats::default(),
        }
    }

    /// Key a request would be cached under
    pub fn key_for(&self, request: &BindingRequest) -> IdentityKey {
        self.hasher.key_for_targets(&request.targets, request.variant)
    }

    /// Fill `handle` with a validated binding for `request`
    ///
    /// Whatever `handle` held before is released first unless it already is
    /// the binding being asked for. On failure the handle is left empty and
    /// the cache map is not modified.
    pub fn get_or_create(
        &mut self,
        handle: &mut Option<BindingHandle>,
        request: &BindingRequest,
    ) -> Result<BindingHandle> {
        if let Some(current) = handle.as_ref() {
            if current.matches(&request.targets, request.context.as_ref(), request.variant)
                && Self::is_valid(current)
            {
                self.stats.fast_paths += 1;
                return Ok(current.clone());
            }
        }

        self.dispose(handle, false);

        if request.targets.iter().all(Option::is_none) {
            self.diagnostics.error(None, "binding requested for an empty target set");
            return Err(CacheError::EmptyTargets);
        }

        let key = self.key_for(request);

        if let Some(cached) = self.entries.get(&key).cloned() {
            if Self::is_valid(&cached) {
                debug!("Cache hit for {}", key);
                self.stats.hits += 1;
                cached.with_state(|state| state.on_activated());
                *handle = Some(cached.clone());
                return Ok(cached);
            }

            debug!("Evicting stale binding #{} under {}", cached.id(), key);
            self.stats.stale_evictions += 1;
            self.dispose_tree(cached);
        }

        self.stats.misses += 1;
        let binding = self.construct(key, request)?;

        if request.cache {
            if let Some(displaced) = self.entries.insert(key, binding.clone()) {
                if !Rc::ptr_eq(&displaced, &binding) {
                    self.dispose_tree(displaced);
                }
            }
        }

        *handle = Some(binding.clone());
        Ok(binding)
    }

    fn construct(&mut self, key: IdentityKey, request: &BindingRequest) -> Result<BindingHandle> {
        let builder = match self.builders.resolve(request.kind.as_deref(), &request.targets) {
            Ok(builder) => builder,
            Err(err) => {
                self.stats.construction_failures += 1;
                warn!("No builder for {}: {}", key, err);
                self.diagnostics.error(Some(key), &err.to_string());
                return Err(err);
            }
        };

        match builder.build(&request.targets, request.context.as_ref()) {
            Ok(state) => {
                self.stats.constructed += 1;
                let binding = Rc::new(Binding::new(
                    builder.kind(),
                    request.cache.then_some(key),
                    request.variant,
                    request.targets.clone(),
                    request.context.clone(),
                    state,
                ));
                debug!("Constructed '{}' binding #{} for {}", builder.kind(), binding.id(), key);
                Ok(binding)
            }
            Err(source) => {
                self.stats.construction_failures += 1;
                let err = CacheError::ConstructionFailed {
                    kind: builder.kind(),
                    source,
                };
                warn!("{}", err);
                self.diagnostics.error(Some(key), &err.to_string());
                Err(err)
            }
        }
    }

    /// Release a caller's handle
    ///
    /// Without `force_remove`, a binding that is still the cached entry for
    /// its key, still valid, and not caught in a reload stays cached and only
    /// the handle is cleared. Otherwise the binding and every nested binding
    /// are evicted and disposed. The handle is always cleared.
    pub fn dispose(&mut self, handle: &mut Option<BindingHandle>, force_remove: bool) {
        let Some(binding) = handle.take() else {
            return;
        };

        if !force_remove && !self.reloading && self.is_cached(&binding) && Self::is_valid(&binding)
        {
            debug!("Soft release of binding #{}", binding.id());
            self.stats.soft_releases += 1;
            return;
        }

        self.dispose_tree(binding);
    }

    /// Whether every target of `binding`, including targets of nested
    /// bindings, is still alive
    pub fn validate(&self, binding: &Binding) -> bool {
        Self::is_valid(binding)
    }

    fn is_valid(binding: &Binding) -> bool {
        !binding.is_disposed() && all_alive(binding.targets())
    }

    fn is_cached(&self, binding: &BindingHandle) -> bool {
        binding
            .key()
            .and_then(|key| self.entries.get(&key))
            .is_some_and(|cached| Rc::ptr_eq(cached, binding))
    }

    /// Sweep the cache, disposing every entry that no longer validates
    ///
    /// Returns the number of entries removed.
    pub fn clean_up(&mut self) -> usize {
        let rejected = self.entries.sweep(|_, binding| Self::is_valid(binding));
        let removed = rejected.len();

        for (key, binding) in rejected {
            debug!("Sweeping binding #{} under {}", binding.id(), key);
            self.dispose_tree(binding);
        }

        self.stats.swept += removed as u64;
        if removed > 0 {
            debug!("Cleanup removed {} binding(s), {} remain", removed, self.entries.len());
        }
        removed
    }

    /// Evict and dispose a binding and everything nested in it
    fn dispose_tree(&mut self, root: BindingHandle) {
        let plan = DisposalWalk::plan(&root);

        if let Some(id) = plan.cycle {
            let err = CacheError::CycleDetected { id };
            error!("{}", err);
            self.diagnostics.error(root.key(), &err.to_string());
        }

        for binding in plan.order {
            if self.is_cached(&binding) {
                if let Some(key) = binding.key() {
                    self.entries.remove(&key);
                }
            }
            self.teardown(&binding);
        }
    }

    /// Physical disposal of one binding, at most once
    ///
    /// The sub-resource is taken before teardown and released after it.
    fn teardown(&mut self, binding: &Binding) {
        if !binding.mark_disposed() {
            return;
        }

        let sub_resource = binding.with_state(|state| state.take_sub_resource()).flatten();

        let teardown = match self.policies.policy_for(binding) {
            DisposalPolicy::Standard => self.run_teardown(binding),
            DisposalPolicy::FixUpFirst(fix_up) => {
                fix_up(binding).and_then(|()| self.run_teardown(binding))
            }
            DisposalPolicy::SkipTeardown => {
                debug!("Skipping teardown of '{}' binding #{}", binding.kind(), binding.id());
                Ok(())
            }
        };
        if let Err(err) = teardown {
            self.report_fault(binding, "teardown", &err);
        }

        if let Some(sub_resource) = sub_resource {
            if let Err(err) = sub_resource.release() {
                self.report_fault(binding, "sub-resource release", &err);
            }
        }

        self.stats.disposed += 1;
    }

    fn run_teardown(&self, binding: &Binding) -> anyhow::Result<()> {
        binding
            .with_state(|state| state.teardown())
            .unwrap_or_else(|| Err(anyhow::anyhow!("binding state is borrowed during teardown")))
    }

    fn report_fault(&mut self, binding: &Binding, stage: &str, err: &anyhow::Error) {
        self.stats.disposal_faults += 1;
        let message = format!(
            "{} of '{}' binding #{} failed: {:#}",
            stage,
            binding.kind(),
            binding.id(),
            err
        );
        warn!("{}", message);
        self.diagnostics.warning(binding.key(), &message);
    }

    /// Capture the key/handle pairs for a reload boundary
    pub fn snapshot(&self) -> BindingSnapshot {
        self.entries
            .iter()
            .map(|(key, binding)| (*key, Some(binding.clone())))
            .collect()
    }

    /// Rehydrate entries after a reload boundary
    ///
    /// Entries are taken as-is; nothing is validated until
    /// [`revalidate_after_reload`](Self::revalidate_after_reload) runs.
    pub fn restore(&mut self, snapshot: BindingSnapshot) {
        let total = snapshot.len();
        let mut restored = 0;

        for (key, handle) in snapshot.into_entries() {
            let Some(binding) = handle else {
                self.stats.dropped_after_reload += 1;
                continue;
            };
            restored += 1;
            if let Some(displaced) = self.entries.insert(key, binding.clone()) {
                if !Rc::ptr_eq(&displaced, &binding) {
                    self.dispose_tree(displaced);
                }
            }
        }

        self.reloading = true;
        info!("Restored {} of {} cached binding(s)", restored, total);
    }

    /// Deferred pass after a reload: drop, without disposing, every entry
    /// whose targets did not survive
    pub fn revalidate_after_reload(&mut self) -> usize {
        let dropped = self.entries.sweep(|_, binding| Self::is_valid(binding)).len();
        self.reloading = false;
        self.stats.dropped_after_reload += dropped as u64;

        if dropped > 0 {
            info!("Dropped {} binding(s) that did not survive the reload", dropped);
            self.diagnostics.info(
                None,
                &format!("{} binding(s) did not survive the reload", dropped),
            );
        }
        dropped
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// Force-dispose every cached binding
    pub fn dispose_all(&mut self) {
        for (_, binding) in self.entries.take_all() {
            self.dispose_tree(binding);
        }
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&BindingHandle> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &IdentityKey) -> bool {
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

    pub fn hasher(&self) -> KeyHasher {
        self.hasher
    }

    pub fn builders_mut(&mut self) -> &mut BuilderRegistry {
        &mut self.builders
    }

    pub fn policies_mut(&mut self) -> &mut DisposalPolicies {
        &mut self.policies
    }
}
