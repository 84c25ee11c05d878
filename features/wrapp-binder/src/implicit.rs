//! Reverse index from interfaces and abstract bases to concrete bindings.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    descriptor::{Ancestor, TypeRef, Upcast},
    types::TypeInfo,
};

/// A concrete binding able to serve an ancestor
#[derive(Clone)]
pub(crate) struct Candidate {
    pub(crate) concrete: TypeRef,
    pub(crate) upcast: Upcast,
}
impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Candidate").field(&self.concrete).finish()
    }
}

#[derive(Default)]
pub(crate) struct ImplicitIndex {
    candidates: HashMap<TypeInfo, Vec<Candidate>>,
}

impl ImplicitIndex {
    /// Adds `concrete` as candidate of each of its ancestors
    ///
    /// Returns the ancestors whose candidate set changed.
    pub(crate) fn add(&mut self, concrete: TypeRef, ancestors: Vec<Ancestor>) -> Vec<TypeInfo> {
        let mut changed = Vec::new();
        for ancestor in ancestors {
            let target = ancestor.target().info();
            let candidates = self.candidates.entry(target).or_default();
            if candidates.iter().any(|existing| existing.concrete == concrete) {
                continue;
            }

            debug!("'{}' is an implicit candidate for '{}'", concrete.info(), target);
            candidates.push(Candidate {
                concrete,
                upcast: ancestor.upcast,
            });
            changed.push(target);
        }
        changed
    }

    pub(crate) fn candidates(&self, ancestor: TypeInfo) -> &[Candidate] {
        self.candidates
            .get(&ancestor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
