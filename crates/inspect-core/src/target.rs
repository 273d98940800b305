//! Inspection targets and the liveness walk shared by both caches

use rustc_hash::FxHashSet;
use std::fmt;
use std::rc::Rc;

use crate::binding::BindingHandle;

/// A domain object that can be inspected
///
/// The cache trusts only the identity token and the liveness predicate; it
/// never relies on reference equality surviving a reload.
pub trait Target {
    /// Stable per-process identity token
    fn identity(&self) -> i32;

    /// False once the underlying object has been destroyed
    fn is_alive(&self) -> bool;

    /// Concrete type name, used to look up preview providers
    fn type_name(&self) -> &'static str;

    /// Binding kinds this target declares it can be edited with, most
    /// specific first
    fn capabilities(&self) -> &[&'static str] {
        &[]
    }
}

/// One entry of a binding's target list
#[derive(Clone)]
pub enum TargetRef {
    Object(Rc<dyn Target>),
    /// Another binding nested inside this one
    Binding(BindingHandle),
}

impl TargetRef {
    pub fn object(target: Rc<dyn Target>) -> Self {
        TargetRef::Object(target)
    }

    pub fn binding(binding: BindingHandle) -> Self {
        TargetRef::Binding(binding)
    }

    pub fn identity(&self) -> i32 {
        match self {
            TargetRef::Object(target) => target.identity(),
            TargetRef::Binding(binding) => binding.identity(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TargetRef::Object(target) => target.type_name(),
            TargetRef::Binding(binding) => binding.kind(),
        }
    }

    pub fn capabilities(&self) -> &[&'static str] {
        match self {
            TargetRef::Object(target) => target.capabilities(),
            TargetRef::Binding(_) => &[],
        }
    }

    pub fn as_binding(&self) -> Option<&BindingHandle> {
        match self {
            TargetRef::Binding(binding) => Some(binding),
            TargetRef::Object(_) => None,
        }
    }

    /// Same underlying object (pointer identity, not token identity)
    pub fn same_as(&self, other: &TargetRef) -> bool {
        match (self, other) {
            (TargetRef::Object(a), TargetRef::Object(b)) => Rc::ptr_eq(a, b),
            (TargetRef::Binding(a), TargetRef::Binding(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<BindingHandle> for TargetRef {
    fn from(binding: BindingHandle) -> Self {
        TargetRef::Binding(binding)
    }
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Object(target) => f
                .debug_struct("Object")
                .field("type", &target.type_name())
                .field("identity", &target.identity())
                .field("alive", &target.is_alive())
                .finish(),
            TargetRef::Binding(binding) => f
                .debug_struct("Binding")
                .field("id", &binding.id())
                .field("kind", &binding.kind())
                .finish(),
        }
    }
}

/// Element-wise pointer comparison of two target lists
pub fn same_targets(a: &[Option<TargetRef>], b: &[Option<TargetRef>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Some(x), Some(y)) => x.same_as(y),
            (None, None) => true,
            _ => false,
        })
}

/// True when the list holds at least one target and every target is alive,
/// looking through nested bindings recursively
///
/// A disposed nested binding counts as dead. A binding reached twice is only
/// walked once.
pub fn all_alive(targets: &[Option<TargetRef>]) -> bool {
    let mut seen = FxHashSet::default();
    targets_alive(targets, &mut seen)
}

fn targets_alive(targets: &[Option<TargetRef>], seen: &mut FxHashSet<u64>) -> bool {
    let mut present = false;
    for target in targets.iter().flatten() {
        present = true;
        let alive = match target {
            TargetRef::Object(object) => object.is_alive(),
            TargetRef::Binding(binding) => {
                !binding.is_disposed()
                    && (!seen.insert(binding.id()) || targets_alive(binding.targets(), seen))
            }
        };
        if !alive {
            return false;
        }
    }
    present
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct StubTarget {
        id: i32,
        alive: Cell<bool>,
    }

    impl Target for StubTarget {
        fn identity(&self) -> i32 {
            self.id
        }

        fn is_alive(&self) -> bool {
            self.alive.get()
        }

        fn type_name(&self) -> &'static str {
            "stub"
        }
    }

    fn stub(id: i32) -> Rc<StubTarget> {
        Rc::new(StubTarget {
            id,
            alive: Cell::new(true),
        })
    }

    #[test]
    fn test_all_alive_requires_a_target() {
        assert!(!all_alive(&[]));
        assert!(!all_alive(&[None, None]));
    }

    #[test]
    fn test_dead_target_fails_liveness() {
        let a = stub(1);
        let b = stub(2);
        let list = vec![Some(TargetRef::object(a.clone())), Some(TargetRef::object(b.clone()))];
        assert!(all_alive(&list));

        b.alive.set(false);
        assert!(!all_alive(&list));
    }

    #[test]
    fn test_nulls_are_ignored_by_liveness() {
        let a = stub(1);
        assert!(all_alive(&[None, Some(TargetRef::object(a))]));
    }

    #[test]
    fn test_same_targets_uses_pointer_identity() {
        let a = stub(1);
        let twin = stub(1);
        let left = vec![Some(TargetRef::object(a.clone()))];
        let right = vec![Some(TargetRef::object(a))];
        let other = vec![Some(TargetRef::object(twin))];

        assert!(same_targets(&left, &right));
        assert!(!same_targets(&left, &other));
        assert!(!same_targets(&left, &[None]));
    }
}
