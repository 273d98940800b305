use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::binding::BindingHandle;
use crate::identity::PreviewableKey;
use crate::target::{all_alive, TargetRef};

/// Provider type reported by the wrapper around the main binding
pub const BINDING_PREVIEW: &str = "binding";

pub type PreviewHandle = Rc<PreviewWrapper>;

/// State created by a preview provider
pub trait PreviewState {
    fn on_activated(&mut self) {}

    /// False once the state no longer matches the structure of its targets
    fn is_structurally_valid(&self) -> bool {
        true
    }

    fn teardown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

pub enum PreviewContent {
    /// The main binding; owned by the binding cache, not by the wrapper
    Binding(BindingHandle),
    Provider {
        provider: &'static str,
        state: RefCell<Box<dyn PreviewState>>,
    },
}

/// One entry in an ordered preview list
pub struct PreviewWrapper {
    key: Option<PreviewableKey>,
    targets: Vec<Option<TargetRef>>,
    content: PreviewContent,
    disposed: Cell<bool>,
}

impl PreviewWrapper {
    pub(crate) fn for_binding(binding: BindingHandle) -> Self {
        Self {
            key: None,
            targets: binding.targets().to_vec(),
            content: PreviewContent::Binding(binding),
            disposed: Cell::new(false),
        }
    }

    pub(crate) fn for_provider(
        key: PreviewableKey,
        targets: Vec<Option<TargetRef>>,
        state: Box<dyn PreviewState>,
    ) -> Self {
        Self {
            key: Some(key),
            targets,
            content: PreviewContent::Provider {
                provider: key.provider,
                state: RefCell::new(state),
            },
            disposed: Cell::new(false),
        }
    }

    pub fn key(&self) -> Option<PreviewableKey> {
        self.key
    }

    pub fn provider_type(&self) -> &'static str {
        match &self.content {
            PreviewContent::Binding(_) => BINDING_PREVIEW,
            PreviewContent::Provider { provider, .. } => *provider,
        }
    }

    pub fn binding(&self) -> Option<&BindingHandle> {
        match &self.content {
            PreviewContent::Binding(binding) => Some(binding),
            PreviewContent::Provider { .. } => None,
        }
    }

    pub fn targets(&self) -> &[Option<TargetRef>] {
        &self.targets
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Whether the wrapped state still fits its targets' structure
    pub fn is_structurally_valid(&self) -> bool {
        match &self.content {
            PreviewContent::Binding(binding) => !binding.is_disposed(),
            PreviewContent::Provider { state, .. } => state
                .try_borrow()
                .map(|state| state.is_structurally_valid())
                .unwrap_or(false),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        !self.is_disposed() && self.is_structurally_valid() && all_alive(&self.targets)
    }

    pub(crate) fn activate(&self) {
        if let PreviewContent::Provider { state, .. } = &self.content {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.on_activated();
            }
        }
    }

    /// Tear the wrapper down once. The main binding is left to its cache,
    /// so only provider content yields a result to count.
    pub(crate) fn teardown(&self) -> Option<anyhow::Result<()>> {
        if self.disposed.replace(true) {
            return None;
        }
        match &self.content {
            PreviewContent::Binding(_) => None,
            PreviewContent::Provider { state, .. } => Some(
                state
                    .try_borrow_mut()
                    .map_err(|_| anyhow::anyhow!("preview state is borrowed during teardown"))
                    .and_then(|mut state| state.teardown()),
            ),
        }
    }
}

impl fmt::Debug for PreviewWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewWrapper")
            .field("provider", &self.provider_type())
            .field("key", &self.key)
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
