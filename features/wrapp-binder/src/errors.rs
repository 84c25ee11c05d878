use std::sync::Arc;

use thiserror::Error;

use crate::types::{DynError, TypeInfo};

/// Configuration errors
///
/// Raised by registration, compilation and `verify`. They are never retried,
/// fixing the binding and resolving again is the only recovery.
#[derive(Error, Debug, Clone)]
pub enum BindingError {
    /// A binding's compilation re-entered itself through constructor or factory dependencies
    #[error("Resolution recursion detected while compiling '{key}' through {chain:?}")]
    RecursionDetected { key: TypeInfo, chain: Vec<TypeInfo> },

    /// Several implicit candidates and no explicit binding to pick one
    #[error("Ambiguous binding for '{service}', candidates: {candidates:?}")]
    AmbiguousBinding {
        service: TypeInfo,
        candidates: Vec<TypeInfo>,
    },

    #[error("Unable to resolve interface '{0}' - bind it or mark it as implemented by a concrete type")]
    UnresolvableInterface(TypeInfo),

    #[error("No appropriate constructor found for '{0}'")]
    NoAppropriateConstructor(TypeInfo),

    /// Member injection targets must be shared (reference) types
    #[error("Member '{member}' of '{owner}' targets value type '{target}'")]
    InvalidMemberTarget {
        owner: TypeInfo,
        member: &'static str,
        target: TypeInfo,
    },

    #[error("Member '{member}' belongs to '{owner}' but the binding produces '{product}'")]
    MemberOwnerMismatch {
        owner: TypeInfo,
        member: &'static str,
        product: TypeInfo,
    },

    #[error("Binding for '{0}' produces a shared value, members can't be injected into it")]
    MembersOnSharedProduct(TypeInfo),

    #[error("The registry can't be bound, it always resolves to itself: '{0}'")]
    SelfBinding(TypeInfo),

    #[error("Tried to register '{0}' after resolution has started")]
    RegistrationFrozen(TypeInfo),

    /// Both a constructor and a factory were chosen
    #[error("Binding for '{0}' has both a constructor and a factory")]
    ConflictingRecipe(TypeInfo),

    #[error("'{implementation}' can't be bound to '{service}', it does not implement it")]
    NotAssignable {
        service: TypeInfo,
        implementation: TypeInfo,
    },

    /// The recipe does not build the implementation chosen with `to`
    #[error("Recipe for '{service}' builds '{product}' instead of its implementation '{implementation}'")]
    RecipeMismatch {
        service: TypeInfo,
        implementation: TypeInfo,
        product: TypeInfo,
    },

    #[error("Open generic binding '{service}' -> '{implementation}' can't be closed: {reason}")]
    GenericMismatch {
        service: &'static str,
        implementation: &'static str,
        reason: GenericMismatchReason,
    },

    /// Nothing is bound and the key may not be auto-bound
    #[error("Nothing is registered for '{0}'")]
    NotRegistered(String),
}

/// Why an open generic binding could not be closed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenericMismatchReason {
    #[error("the implementation is not generic")]
    NotGeneric,
    #[error("arity {implementation} does not match arity {service}")]
    ArityMismatch { service: usize, implementation: usize },
    #[error("expected {expected} type arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("no instantiation for {0:?} is described")]
    MissingInstantiation(Vec<&'static str>),
    #[error("'{0}' does not derive from the requested type")]
    NotDerived(&'static str),
}

/// Errors returned when resolving or injecting
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// A constructor or factory failed
    #[error("Factory for '{product}' failed - error: {error:?}")]
    FactoryFailed {
        product: TypeInfo,
        error: Arc<DynError>,
    },

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// A compiled plan outlived the registry it was compiled by
    #[error("The registry was dropped")]
    RegistryDropped,
}

impl ResolveError {
    pub(crate) fn factory_failed(product: TypeInfo, error: DynError) -> Self {
        ResolveError::FactoryFailed {
            product,
            error: Arc::new(error),
        }
    }

    /// The configuration error behind this failure, if any
    pub fn binding_error(&self) -> Option<&BindingError> {
        match self {
            ResolveError::Binding(error) => Some(error),
            _ => None,
        }
    }
}
