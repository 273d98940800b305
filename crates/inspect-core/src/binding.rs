//! Bindings: heavyweight editable views over a fixed target set

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::identity::IdentityKey;
use crate::target::{same_targets, TargetRef};

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a binding. Callers release it through the cache.
pub type BindingHandle = Rc<Binding>;

/// Opaque caller context a binding is created with. Compared by pointer.
pub type BindingContext = Rc<dyn Any>;

/// A resource owned by a binding's state that must be released after the
/// state has been torn down
pub trait SubResource {
    fn release(self: Box<Self>) -> anyhow::Result<()>;
}

/// Host-specific state produced by a [`BindingBuilder`](crate::builder::BindingBuilder)
pub trait BindingState {
    /// Called each time a cached binding is handed out again
    fn on_activated(&mut self) {}

    /// Hand over the owned sub-resource so it can be released after teardown
    fn take_sub_resource(&mut self) -> Option<Box<dyn SubResource>> {
        None
    }

    fn teardown(&mut self) -> anyhow::Result<()>;
}

/// A binding over one fixed target list
///
/// The target list never changes after construction. Entries may themselves
/// be bindings, which makes the structure a tree.
pub struct Binding {
    id: u64,
    kind: &'static str,
    key: Option<IdentityKey>,
    variant: bool,
    targets: Vec<Option<TargetRef>>,
    context: Option<BindingContext>,
    state: RefCell<Box<dyn BindingState>>,
    disposed: Cell<bool>,
}

impl Binding {
    pub(crate) fn new(
        kind: &'static str,
        key: Option<IdentityKey>,
        variant: bool,
        targets: Vec<Option<TargetRef>>,
        context: Option<BindingContext>,
        state: Box<dyn BindingState>,
    ) -> Self {
        Self {
            id: NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            key,
            variant,
            targets,
            context,
            state: RefCell::new(state),
            disposed: Cell::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Identity token when this binding is used as another binding's target
    ///
    /// The serial id is scrambled so nested bindings do not share the small
    /// integers hosts hand out as object tokens.
    pub fn identity(&self) -> i32 {
        mix_id(self.id)
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Cache key, `None` for bindings created with caching disabled
    pub fn key(&self) -> Option<IdentityKey> {
        self.key
    }

    pub fn variant(&self) -> bool {
        self.variant
    }

    pub fn targets(&self) -> &[Option<TargetRef>] {
        &self.targets
    }

    pub fn context(&self) -> Option<&BindingContext> {
        self.context.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Bindings found directly in this binding's target list
    pub fn nested(&self) -> impl Iterator<Item = &BindingHandle> + '_ {
        self.targets
            .iter()
            .flatten()
            .filter_map(TargetRef::as_binding)
    }

    /// Whether this binding was created for exactly this request
    pub fn matches(
        &self,
        targets: &[Option<TargetRef>],
        context: Option<&BindingContext>,
        variant: bool,
    ) -> bool {
        let same_context = match (&self.context, context) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.variant == variant && same_context && same_targets(&self.targets, targets)
    }

    /// Run `f` against the state. Returns `None` if the state is already
    /// borrowed further up the stack.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut dyn BindingState) -> R) -> Option<R> {
        let mut state = self.state.try_borrow_mut().ok()?;
        Some(f(state.as_mut()))
    }

    pub(crate) fn mark_disposed(&self) -> bool {
        !self.disposed.replace(true)
    }
}

/// splitmix64 finalizer, folded to 32 bits
fn mix_id(id: u64) -> i32 {
    let mut z = id.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^= z >> 31;
    ((z >> 32) as u32 ^ z as u32) as i32
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("variant", &self.variant)
            .field("targets", &self.targets)
            .field("has_context", &self.context.is_some())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
