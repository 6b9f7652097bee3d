// THEORY:
// Each live entity wears one visual variant, and no two live entities may wear
// the same one. The `VariantPool` owns the finite set of variant tokens: tokens
// are drawn on spawn and returned only when the entity is actually destroyed,
// not when it starts collapsing. The free list and the in-use set are always
// disjoint and together always cover the whole configured range.
//
// Tokens are handed out lowest-first. Any other order would do for the
// invariant; lowest-first keeps runs reproducible.

use std::collections::BTreeSet;
use std::fmt;

/// Exclusive handle on one visual variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantToken(usize);

impl VariantToken {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VariantToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variant#{}", self.0)
    }
}

#[derive(Debug)]
pub struct VariantPool {
    size: usize,
    free: BTreeSet<VariantToken>,
    in_use: BTreeSet<VariantToken>,
}

impl VariantPool {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            free: (0..size).map(VariantToken).collect(),
            in_use: BTreeSet::new(),
        }
    }

    pub fn acquire(&mut self) -> Option<VariantToken> {
        let token = self.free.pop_first()?;
        self.in_use.insert(token);
        Some(token)
    }

    /// Returns a token to the pool. Releasing a token that is not in use is a no-op.
    pub fn release(&mut self, token: VariantToken) -> bool {
        if !self.in_use.remove(&token) {
            tracing::debug!(%token, "ignoring release of a token that is not in use");
            return false;
        }
        self.free.insert(token);
        true
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn in_use(&self) -> impl Iterator<Item = VariantToken> + '_ {
        self.in_use.iter().copied()
    }

    pub fn is_in_use(&self, token: VariantToken) -> bool {
        self.in_use.contains(&token)
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
