use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::cell::OnceCell;
use std::rc::Rc;
use tracing::{debug, info};

use crate::target::TargetRef;

use super::PreviewState;

/// Produces preview state for targets of one type
pub trait PreviewProvider {
    /// Name of the provider, part of its cache key
    fn provider_type(&self) -> &'static str;

    /// Target type the provider applies to
    fn target_type(&self) -> &'static str;

    fn create(&self, targets: &[Option<TargetRef>]) -> anyhow::Result<Box<dyn PreviewState>>;
}

/// Link-time provider registration
///
/// Submit with `inventory::submit!` from the module that defines the
/// provider; the registry picks it up the first time it is indexed.
#[derive(Clone, Copy)]
pub struct ProviderRegistration {
    pub provider_type: &'static str,
    pub target_type: &'static str,
    pub create: fn(&[Option<TargetRef>]) -> anyhow::Result<Box<dyn PreviewState>>,
}

inventory::collect!(ProviderRegistration);

impl PreviewProvider for ProviderRegistration {
    fn provider_type(&self) -> &'static str {
        self.provider_type
    }

    fn target_type(&self) -> &'static str {
        self.target_type
    }

    fn create(&self, targets: &[Option<TargetRef>]) -> anyhow::Result<Box<dyn PreviewState>> {
        (self.create)(targets)
    }
}

type ProviderIndex = IndexMap<&'static str, Vec<Rc<dyn PreviewProvider>>>;

/// Providers indexed by the target type they apply to
///
/// The index is built lazily on first lookup. Registering another provider
/// afterwards drops the index so the next lookup rebuilds it.
pub struct ProviderRegistry {
    explicit: Vec<Rc<dyn PreviewProvider>>,
    include_static: bool,
    disabled: FxHashSet<String>,
    index: OnceCell<ProviderIndex>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Registry that also indexes link-time registrations
    pub fn new() -> Self {
        Self {
            explicit: Vec::new(),
            include_static: true,
            disabled: FxHashSet::default(),
            index: OnceCell::new(),
        }
    }

    /// Registry limited to providers registered through [`register`](Self::register)
    pub fn explicit_only() -> Self {
        Self {
            include_static: false,
            ..Self::new()
        }
    }

    pub fn register(&mut self, provider: Rc<dyn PreviewProvider>) {
        self.explicit.push(provider);
        self.index.take();
    }

    /// Never instantiate providers of this type
    pub fn disable(&mut self, provider_type: impl Into<String>) {
        self.disabled.insert(provider_type.into());
        self.index.take();
    }

    pub fn providers_for(&self, target_type: &str) -> &[Rc<dyn PreviewProvider>] {
        self.index()
            .get(target_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_built(&self) -> bool {
        self.index.get().is_some()
    }

    fn index(&self) -> &ProviderIndex {
        self.index.get_or_init(|| self.build())
    }

    fn build(&self) -> ProviderIndex {
        let statics = self
            .include_static
            .then(|| inventory::iter::<ProviderRegistration>.into_iter())
            .into_iter()
            .flatten()
            .map(|registration| Rc::new(*registration) as Rc<dyn PreviewProvider>);

        let mut index = ProviderIndex::new();
        let mut count = 0;
        for provider in statics.chain(self.explicit.iter().cloned()) {
            if self.disabled.contains(provider.provider_type()) {
                debug!("Provider '{}' is disabled", provider.provider_type());
                continue;
            }
            index.entry(provider.target_type()).or_default().push(provider);
            count += 1;
        }

        info!(
            "Indexed {} preview provider(s) across {} target type(s)",
            count,
            index.len()
        );
        index
    }
}
