//! Open generic bindings, closed per instantiation on first request.

use std::{any::TypeId, collections::HashMap};

use tracing::debug;

use crate::{
    catalog::TypeCatalog,
    descriptor::{
        generic::{GenericDef, GenericDefinition, GenericInstance},
        TypeDescriptor, TypeRef, Upcast,
    },
    errors::{BindingError, GenericMismatchReason},
    lifestyle::Lifestyle,
};

/// Binding template `Service<..> -> Implementation<..>`
///
/// Each requested instantiation of the service is served by the
/// implementation instantiated with the same type arguments. Instantiations
/// are found among the described types, so every closed implementation
/// needs a [crate::Describe] impl naming its generic definition.
#[derive(Debug, Clone)]
pub struct OpenGenericBinding {
    service: GenericDef,
    implementation: GenericDef,
    lifestyle: Option<Lifestyle>,
}

impl OpenGenericBinding {
    pub fn new<S: GenericDefinition, I: GenericDefinition>() -> Self {
        Self::between(GenericDef::of::<S>(), GenericDef::of::<I>())
    }

    pub fn between(service: GenericDef, implementation: GenericDef) -> Self {
        OpenGenericBinding {
            service,
            implementation,
            lifestyle: None,
        }
    }

    /// Lifestyle of every closed binding, defaults to the implementation's own
    pub fn with_lifestyle(mut self, lifestyle: Lifestyle) -> Self {
        self.lifestyle = Some(lifestyle);
        self
    }

    pub fn singleton(self) -> Self {
        self.with_lifestyle(Lifestyle::Singleton)
    }

    pub fn service(&self) -> GenericDef {
        self.service
    }

    pub fn implementation(&self) -> GenericDef {
        self.implementation
    }

    pub fn lifestyle(&self) -> Option<&Lifestyle> {
        self.lifestyle.as_ref()
    }

    fn mismatch(&self, reason: GenericMismatchReason) -> BindingError {
        BindingError::GenericMismatch {
            service: self.service.name,
            implementation: self.implementation.name,
            reason,
        }
    }

    /// Checks the arities of both definitions
    pub(crate) fn check(&self) -> Result<(), BindingError> {
        if self.implementation.arity == 0 {
            return Err(self.mismatch(GenericMismatchReason::NotGeneric));
        }
        if self.implementation.arity != self.service.arity {
            return Err(self.mismatch(GenericMismatchReason::ArityMismatch {
                service: self.service.arity,
                implementation: self.implementation.arity,
            }));
        }
        Ok(())
    }

    /// Finds the closed implementation serving `requested`
    pub(crate) fn close(
        &self,
        requested: &TypeDescriptor,
        catalog: &mut TypeCatalog,
    ) -> Result<Closed, BindingError> {
        self.check()?;

        let Some(generic) = requested.generic() else {
            return Err(self.mismatch(GenericMismatchReason::NotGeneric));
        };
        if generic.args.len() != self.service.arity {
            return Err(self.mismatch(GenericMismatchReason::ArgumentCount {
                expected: self.service.arity,
                actual: generic.args.len(),
            }));
        }

        let wanted = GenericInstance {
            definition: self.implementation,
            args: generic.args.clone(),
        };
        let implementation = catalog
            .instantiation(&wanted)
            .ok_or_else(|| self.mismatch(GenericMismatchReason::MissingInstantiation(wanted.arg_names())))?;

        let upcast = if implementation.info() == requested.info() {
            None
        } else {
            let descriptor = catalog.describe(implementation);
            let ancestor = catalog
                .ancestor(&descriptor, requested.info())
                .ok_or_else(|| self.mismatch(GenericMismatchReason::NotDerived(implementation.info().type_name)))?;
            Some(ancestor.upcast)
        };

        debug!(
            "Closed {} -> {} for '{}' with '{}'",
            self.service,
            self.implementation,
            requested.info(),
            implementation.info()
        );
        Ok(Closed {
            implementation,
            upcast,
            lifestyle: self.lifestyle.clone(),
        })
    }
}

/// Outcome of closing an open generic binding
pub(crate) struct Closed {
    pub(crate) implementation: TypeRef,
    /// Converts the implementation into the requested type, if they differ
    pub(crate) upcast: Option<Upcast>,
    pub(crate) lifestyle: Option<Lifestyle>,
}

/// Open generic bindings by service definition
#[derive(Default)]
pub(crate) struct OpenGenericIndex {
    templates: HashMap<TypeId, OpenGenericBinding>,
}

impl OpenGenericIndex {
    /// Returns the replaced binding, if any
    pub(crate) fn insert(&mut self, binding: OpenGenericBinding) -> Option<OpenGenericBinding> {
        self.templates.insert(binding.service.id, binding)
    }

    pub(crate) fn template_for(&self, requested: &TypeDescriptor) -> Option<&OpenGenericBinding> {
        let generic = requested.generic()?;
        self.templates.get(&generic.definition.id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::{
        descriptor::{Describe, TypeDescriptor},
        types::{Instance, TypeInfo},
    };

    trait Store<T>: Send + Sync {
        fn kind(&self) -> &'static str;
    }
    struct StoreDef;
    impl GenericDefinition for StoreDef {
        const NAME: &'static str = "Store";
        const ARITY: usize = 1;
    }

    struct Memory<T>(std::marker::PhantomData<T>);
    struct MemoryDef;
    impl GenericDefinition for MemoryDef {
        const NAME: &'static str = "Memory";
        const ARITY: usize = 1;
    }
    impl<T: Send + Sync + 'static> Store<T> for Memory<T> {
        fn kind(&self) -> &'static str {
            "memory"
        }
    }

    struct PairDef;
    impl GenericDefinition for PairDef {
        const NAME: &'static str = "Pair";
        const ARITY: usize = 2;
    }
    struct PlainDef;
    impl GenericDefinition for PlainDef {
        const NAME: &'static str = "Plain";
        const ARITY: usize = 0;
    }

    impl<T: Describe> Describe for dyn Store<T> {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::interface::<dyn Store<T>>()
                .generic(GenericDef::of::<StoreDef>(), vec![TypeInfo::of::<T>()])
                .build()
        }
    }
    impl<T: Describe> Describe for Memory<T> {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::concrete::<Memory<T>>()
                .construct_with(|| Memory(std::marker::PhantomData))
                .implements::<dyn Store<T>>(|memory| memory)
                .generic(GenericDef::of::<MemoryDef>(), vec![TypeInfo::of::<T>()])
                .build()
        }
    }

    #[test]
    fn closes_described_instantiations() {
        let mut catalog = TypeCatalog::default();
        catalog.describe(TypeRef::of::<Memory<String>>());
        let requested = catalog.describe(TypeRef::of::<dyn Store<String>>());

        let closed = OpenGenericBinding::new::<StoreDef, MemoryDef>()
            .close(&requested, &mut catalog)
            .unwrap();
        assert_eq!(closed.implementation.info(), TypeInfo::of::<Memory<String>>());

        let upcast = closed.upcast.unwrap();
        let store = upcast(Instance::new(Arc::new(Memory::<String>(std::marker::PhantomData)))).unwrap();
        assert_eq!(store.downcast::<dyn Store<String>>().unwrap().kind(), "memory");
    }

    #[test]
    fn missing_instantiation_names_the_arguments() {
        let mut catalog = TypeCatalog::default();
        let requested = catalog.describe(TypeRef::of::<dyn Store<u8>>());

        let error = OpenGenericBinding::new::<StoreDef, MemoryDef>()
            .close(&requested, &mut catalog)
            .err()
            .unwrap();
        assert!(matches!(
            error,
            BindingError::GenericMismatch {
                reason: GenericMismatchReason::MissingInstantiation(ref args),
                ..
            } if args == &vec!["u8"]
        ));
    }

    #[rstest]
    #[case::not_generic(OpenGenericBinding::new::<StoreDef, PlainDef>(), GenericMismatchReason::NotGeneric)]
    #[case::arity(
        OpenGenericBinding::new::<StoreDef, PairDef>(),
        GenericMismatchReason::ArityMismatch { service: 1, implementation: 2 }
    )]
    fn arities_are_checked(#[case] binding: OpenGenericBinding, #[case] expected: GenericMismatchReason) {
        match binding.check() {
            Err(BindingError::GenericMismatch { reason, .. }) => assert_eq!(reason, expected),
            other => panic!("expected a generic mismatch, got {other:?}"),
        }
    }

    #[test]
    fn templates_are_found_by_service_definition() {
        let mut index = OpenGenericIndex::default();
        assert!(index.insert(OpenGenericBinding::new::<StoreDef, MemoryDef>()).is_none());

        let mut catalog = TypeCatalog::default();
        let requested = catalog.describe(TypeRef::of::<dyn Store<u8>>());
        let template = index.template_for(&requested).unwrap();
        assert_eq!(template.implementation(), GenericDef::of::<MemoryDef>());

        let plain = catalog.describe(TypeRef::of::<String>());
        assert!(index.template_for(&plain).is_none());
    }
}
