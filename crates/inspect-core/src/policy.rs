//! Type-based disposal policies for host quirks
//!
//! Some host-internal binding kinds crash if torn down the normal way. Rules
//! registered here are consulted at physical disposal time, first match wins.

use std::fmt;
use std::rc::Rc;

use crate::binding::Binding;

/// Hook run against a binding before its teardown
pub type FixUpHook = Rc<dyn Fn(&Binding) -> anyhow::Result<()>>;

type Predicate = Box<dyn Fn(&Binding) -> bool>;

#[derive(Clone, Default)]
pub enum DisposalPolicy {
    /// Tear the state down and release its sub-resource
    #[default]
    Standard,
    /// Run a fix-up call, then tear down normally
    FixUpFirst(FixUpHook),
    /// Do not call teardown; the sub-resource is still released
    SkipTeardown,
}

impl fmt::Debug for DisposalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisposalPolicy::Standard => f.write_str("Standard"),
            DisposalPolicy::FixUpFirst(_) => f.write_str("FixUpFirst"),
            DisposalPolicy::SkipTeardown => f.write_str("SkipTeardown"),
        }
    }
}

/// Ordered `(predicate, policy)` rules
#[derive(Default)]
pub struct DisposalPolicies {
    rules: Vec<(Predicate, DisposalPolicy)>,
}

impl DisposalPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, predicate: F, policy: DisposalPolicy)
    where
        F: Fn(&Binding) -> bool + 'static,
    {
        self.rules.push((Box::new(predicate), policy));
    }

    /// Apply `policy` to every binding of the given kind
    pub fn register_kind(&mut self, kind: &'static str, policy: DisposalPolicy) {
        self.register(move |binding| binding.kind() == kind, policy);
    }

    pub fn policy_for(&self, binding: &Binding) -> DisposalPolicy {
        self.rules
            .iter()
            .find(|(predicate, _)| predicate(binding))
            .map(|(_, policy)| policy.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
