//! Identity keys for cache entries
//!
//! A key is a wrapping integer fold over the identity tokens of a target set.
//! Equality and hashing look only at the folded integer, never at the targets
//! themselves, so two different target sets can collide.

use std::fmt;

use crate::target::TargetRef;

/// Default fold base. Odd, picked empirically to keep collisions rare.
pub const IDENTITY_BASE: i32 = 761;

/// Composite identity of a target set plus a variant flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(i32);

impl IdentityKey {
    /// Wrap an already-folded hash value
    pub const fn from_raw(hash: i32) -> Self {
        Self(hash)
    }

    /// The folded hash value
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Key for a single target using the default hasher
    pub fn for_target(target: &TargetRef, variant: bool) -> Self {
        KeyHasher::default().key_for_target(target, variant)
    }

    /// Key for a target list using the default hasher
    pub fn for_targets(targets: &[Option<TargetRef>], variant: bool) -> Self {
        KeyHasher::default().key_for_targets(targets, variant)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key#{}", self.0)
    }
}

/// Key of a preview wrapper: the provider type plus the target-set key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewableKey {
    pub provider: &'static str,
    pub targets: IdentityKey,
}

impl PreviewableKey {
    pub fn new(provider: &'static str, targets: IdentityKey) -> Self {
        Self { provider, targets }
    }
}

impl fmt::Display for PreviewableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.provider, self.targets)
    }
}

/// Folds identity tokens into keys
///
/// With `distinguish_nulls` off (the default), null entries are skipped and
/// `[None, A]` collides with `[A]`. Turning it on folds a null as token 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyHasher {
    base: i32,
    distinguish_nulls: bool,
}

impl Default for KeyHasher {
    fn default() -> Self {
        Self {
            base: IDENTITY_BASE,
            distinguish_nulls: false,
        }
    }
}

impl KeyHasher {
    pub fn new(base: i32, distinguish_nulls: bool) -> Self {
        Self {
            base,
            distinguish_nulls,
        }
    }

    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn distinguishes_nulls(&self) -> bool {
        self.distinguish_nulls
    }

    pub fn key_for_target(&self, target: &TargetRef, variant: bool) -> IdentityKey {
        let hash = self.base.wrapping_add(target.identity());
        IdentityKey(self.apply_variant(hash, variant))
    }

    pub fn key_for_targets(&self, targets: &[Option<TargetRef>], variant: bool) -> IdentityKey {
        self.fold_tokens(targets.iter().map(|t| t.as_ref().map(TargetRef::identity)), variant)
    }

    /// Fold raw identity tokens, last to first
    pub fn fold_tokens<I>(&self, tokens: I, variant: bool) -> IdentityKey
    where
        I: DoubleEndedIterator<Item = Option<i32>>,
    {
        let mut hash: i32 = 1;
        for token in tokens.rev() {
            let token = match token {
                Some(token) => token,
                None if self.distinguish_nulls => 0,
                None => continue,
            };
            hash = hash.wrapping_mul(self.base).wrapping_add(token);
        }
        IdentityKey(self.apply_variant(hash, variant))
    }

    fn apply_variant(&self, hash: i32, variant: bool) -> i32 {
        if variant {
            hash.wrapping_mul(self.base)
        } else {
            hash
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tokens: &[Option<i32>], variant: bool) -> IdentityKey {
        KeyHasher::default().fold_tokens(tokens.iter().copied(), variant)
    }

    #[test]
    fn test_single_token_fold_matches_base_plus_identity() {
        assert_eq!(key(&[Some(5)], false).raw(), IDENTITY_BASE + 5);
    }

    #[test]
    fn test_variant_multiplies_by_base() {
        assert_eq!(key(&[Some(5)], true).raw(), (IDENTITY_BASE + 5) * IDENTITY_BASE);
    }

    #[test]
    fn test_fold_is_order_sensitive() {
        assert_ne!(key(&[Some(1), Some(2)], false), key(&[Some(2), Some(1)], false));
    }

    #[test]
    fn test_fold_runs_last_to_first() {
        // [a, b] folds b first: (1*B + b)*B + a
        let expected = (IDENTITY_BASE + 2) * IDENTITY_BASE + 1;
        assert_eq!(key(&[Some(1), Some(2)], false).raw(), expected);
    }

    #[test]
    fn test_nulls_are_skipped_by_default() {
        assert_eq!(key(&[None, Some(9)], false), key(&[Some(9)], false));
        assert_eq!(key(&[Some(9), None], false), key(&[Some(9)], false));
    }

    #[test]
    fn test_nulls_perturb_when_distinguished() {
        let hasher = KeyHasher::new(IDENTITY_BASE, true);
        let with_null = hasher.fold_tokens([None, Some(9)].into_iter(), false);
        let without = hasher.fold_tokens([Some(9)].into_iter(), false);
        assert_ne!(with_null, without);
    }

    #[test]
    fn test_overflow_wraps() {
        let big = key(&[Some(i32::MAX), Some(i32::MAX), Some(i32::MAX)], true);
        let again = key(&[Some(i32::MAX), Some(i32::MAX), Some(i32::MAX)], true);
        assert_eq!(big, again);
    }

    #[test]
    fn test_display() {
        assert_eq!(IdentityKey::from_raw(12).to_string(), "key#12");
        let preview = PreviewableKey::new("mesh", IdentityKey::from_raw(3));
        assert_eq!(preview.to_string(), "mesh@key#3");
    }
}
