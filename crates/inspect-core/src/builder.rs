//! Binding builders and kind resolution

use indexmap::IndexMap;
use std::rc::Rc;

use crate::binding::{BindingContext, BindingState};
use crate::errors::{CacheError, Result};
use crate::target::TargetRef;

/// Kind name of the fallback builder
pub const GENERIC_KIND: &str = "generic";

/// Constructs binding state for one kind of binding
pub trait BindingBuilder {
    fn kind(&self) -> &'static str;

    fn build(
        &self,
        targets: &[Option<TargetRef>],
        context: Option<&BindingContext>,
    ) -> anyhow::Result<Box<dyn BindingState>>;
}

/// Fallback builder used when no explicit or declared kind applies
#[derive(Debug, Default)]
pub struct GenericBuilder;

struct GenericState;

impl BindingState for GenericState {
    fn teardown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl BindingBuilder for GenericBuilder {
    fn kind(&self) -> &'static str {
        GENERIC_KIND
    }

    fn build(
        &self,
        targets: &[Option<TargetRef>],
        _context: Option<&BindingContext>,
    ) -> anyhow::Result<Box<dyn BindingState>> {
        if !crate::target::all_alive(targets) {
            anyhow::bail!("cannot bind a target set with destroyed or missing targets");
        }
        Ok(Box::new(GenericState))
    }
}

/// Builders by kind, in registration order
pub struct BuilderRegistry {
    builders: IndexMap<&'static str, Rc<dyn BindingBuilder>>,
    fallback: Rc<dyn BindingBuilder>,
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderRegistry {
    /// Registry with only the generic fallback
    pub fn new() -> Self {
        Self::with_fallback(Rc::new(GenericBuilder))
    }

    pub fn with_fallback(fallback: Rc<dyn BindingBuilder>) -> Self {
        Self {
            builders: IndexMap::new(),
            fallback,
        }
    }

    /// Register a builder under its kind, returning any builder it replaces
    pub fn register(&mut self, builder: Rc<dyn BindingBuilder>) -> Option<Rc<dyn BindingBuilder>> {
        self.builders.insert(builder.kind(), builder)
    }

    pub fn get(&self, kind: &str) -> Option<&Rc<dyn BindingBuilder>> {
        self.builders.get(kind)
    }

    pub fn fallback(&self) -> &Rc<dyn BindingBuilder> {
        &self.fallback
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builders.keys().copied()
    }

    /// Pick the builder for a request
    ///
    /// An explicit kind must be registered (the fallback answers to its own
    /// kind name too). Without one, the first capability declared by the
    /// first present target that has a registered builder wins; otherwise
    /// the fallback is used.
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        targets: &[Option<TargetRef>],
    ) -> Result<Rc<dyn BindingBuilder>> {
        if let Some(kind) = explicit {
            if let Some(builder) = self.builders.get(kind) {
                return Ok(builder.clone());
            }
            if kind == self.fallback.kind() {
                return Ok(self.fallback.clone());
            }
            return Err(CacheError::UnknownKind {
                kind: kind.to_string(),
            });
        }

        let declared = targets
            .iter()
            .flatten()
            .next()
            .into_iter()
            .flat_map(|target| target.capabilities().iter())
            .find_map(|kind| self.builders.get(kind));

        Ok(declared.cloned().unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;

    struct Named(&'static str);

    impl BindingBuilder for Named {
        fn kind(&self) -> &'static str {
            self.0
        }

        fn build(
            &self,
            _targets: &[Option<TargetRef>],
            _context: Option<&BindingContext>,
        ) -> anyhow::Result<Box<dyn BindingState>> {
            Ok(Box::new(GenericState))
        }
    }

    struct Declaring(&'static [&'static str]);

    impl Target for Declaring {
        fn identity(&self) -> i32 {
            1
        }

        fn is_alive(&self) -> bool {
            true
        }

        fn type_name(&self) -> &'static str {
            "declaring"
        }

        fn capabilities(&self) -> &[&'static str] {
            self.0
        }
    }

    fn registry() -> BuilderRegistry {
        let mut registry = BuilderRegistry::new();
        registry.register(Rc::new(Named("mesh")));
        registry.register(Rc::new(Named("material")));
        registry
    }

    #[test]
    fn test_explicit_kind_wins() {
        let targets = vec![Some(TargetRef::object(Rc::new(Declaring(&["mesh"]))))];
        let builder = registry().resolve(Some("material"), &targets).unwrap();
        assert_eq!(builder.kind(), "material");
    }

    #[test]
    fn test_unknown_explicit_kind_is_rejected() {
        let result = registry().resolve(Some("shader"), &[]);
        assert!(matches!(result, Err(CacheError::UnknownKind { kind }) if kind == "shader"));
    }

    #[test]
    fn test_declared_capability_is_used() {
        let targets = vec![
            None,
            Some(TargetRef::object(Rc::new(Declaring(&["unknown", "material"])))),
        ];
        let builder = registry().resolve(None, &targets).unwrap();
        assert_eq!(builder.kind(), "material");
    }

    #[test]
    fn test_falls_back_to_generic() {
        let targets = vec![Some(TargetRef::object(Rc::new(Declaring(&[]))))];
        let builder = registry().resolve(None, &targets).unwrap();
        assert_eq!(builder.kind(), GENERIC_KIND);

        let named = registry().resolve(Some(GENERIC_KIND), &targets).unwrap();
        assert_eq!(named.kind(), GENERIC_KIND);
    }

    #[test]
    fn test_generic_builder_rejects_dead_targets() {
        struct Dead;
        impl Target for Dead {
            fn identity(&self) -> i32 {
                3
            }
            fn is_alive(&self) -> bool {
                false
            }
            fn type_name(&self) -> &'static str {
                "dead"
            }
        }

        let targets = vec![Some(TargetRef::object(Rc::new(Dead)))];
        assert!(GenericBuilder.build(&targets, None).is_err());
    }
}
