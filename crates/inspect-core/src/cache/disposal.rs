use rustc_hash::FxHashSet;

use crate::binding::BindingHandle;

/// Depth-first disposal order for a binding tree
#[derive(Debug)]
pub struct DisposalPlan {
    /// Every reachable binding exactly once, parents before their nested
    /// bindings
    pub order: Vec<BindingHandle>,
    /// Id of a binding found on its own ancestor path, if any
    pub cycle: Option<u64>,
}

/// Walks nested bindings reachable from a root
///
/// A binding reachable along two different paths is visited once. A binding
/// reachable from its own target list is a cycle; the walk records it and
/// does not descend again.
pub struct DisposalWalk {
    visited: FxHashSet<u64>,
    path: Vec<u64>,
    order: Vec<BindingHandle>,
    cycle: Option<u64>,
}

impl DisposalWalk {
    pub fn plan(root: &BindingHandle) -> DisposalPlan {
        let mut walk = Self {
            visited: FxHashSet::default(),
            path: Vec::new(),
            order: Vec::new(),
            cycle: None,
        };
        walk.visit(root);

        DisposalPlan {
            order: walk.order,
            cycle: walk.cycle,
        }
    }

    fn visit(&mut self, binding: &BindingHandle) {
        let id = binding.id();
        if self.path.contains(&id) {
            self.cycle.get_or_insert(id);
            return;
        }
        if !self.visited.insert(id) {
            return;
        }

        self.order.push(binding.clone());
        self.path.push(id);
        for nested in binding.nested() {
            self.visit(nested);
        }
        self.path.pop();
    }
}
