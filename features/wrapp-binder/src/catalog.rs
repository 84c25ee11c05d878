//! Per-registry cache of type descriptors.

use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tracing::debug;

use crate::{
    descriptor::{generic::GenericInstance, Ancestor, TypeDescriptor, TypeRef},
    types::TypeInfo,
};

/// Descriptors are built once per type and then shared.
#[derive(Default)]
pub(crate) struct TypeCatalog {
    descriptors: HashMap<TypeId, Arc<TypeDescriptor>>,
    /// Described closed generics, by definition and arguments
    instantiations: HashMap<GenericInstance, TypeRef>,
}

impl TypeCatalog {
    pub(crate) fn describe(&mut self, ty: TypeRef) -> Arc<TypeDescriptor> {
        if let Some(descriptor) = self.descriptors.get(&ty.info().type_id) {
            return descriptor.clone();
        }

        let descriptor = Arc::new(ty.describe());
        if let Some(generic) = descriptor.generic() {
            debug!("Catalogued '{}' as instantiation of {}", ty.info(), generic.definition);
            self.instantiations.insert(generic.clone(), ty);
        }
        self.descriptors.insert(ty.info().type_id, descriptor.clone());
        descriptor
    }

    /// Described instantiation of a generic definition with `args`
    pub(crate) fn instantiation(&self, generic: &GenericInstance) -> Option<TypeRef> {
        self.instantiations.get(generic).copied()
    }

    /// All ancestors of a type, ancestors of ancestors included
    ///
    /// Every returned upcast converts an instance of the described type
    /// directly into the ancestor.
    pub(crate) fn ancestors_of(&mut self, descriptor: &TypeDescriptor) -> Vec<Ancestor> {
        let mut visited: HashSet<TypeInfo> = HashSet::new();
        let mut found = Vec::new();
        let mut pending: Vec<Ancestor> = descriptor.ancestors().to_vec();

        while let Some(ancestor) = pending.pop() {
            if ancestor.target().info() == descriptor.info() || !visited.insert(ancestor.target().info()) {
                continue;
            }

            let next = self.describe(ancestor.target());
            pending.extend(next.ancestors().iter().map(|further| further.after(&ancestor.upcast)));
            found.push(ancestor);
        }

        found
    }

    /// Ancestor of `descriptor` of type `target`
    pub(crate) fn ancestor(&mut self, descriptor: &TypeDescriptor, target: TypeInfo) -> Option<Ancestor> {
        self.ancestors_of(descriptor)
            .into_iter()
            .find(|ancestor| ancestor.target().info() == target)
    }
}
