use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// Boxed error returned by user recipes
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Resolved values are shared between threads once sealed.
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// A resolved, shared value
///
/// Always wraps an `Arc<T>`, so sized types and trait objects (`Arc<dyn Trait>`)
/// travel through the engine the same way.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    instance: Arc<dyn Any + Send + Sync + 'static>,
}
impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

impl Instance {
    pub fn new<T: ?Sized + Injectable>(value: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance: Arc::new(value),
        }
    }

    /// Recovers the typed `Arc`, or returns the name of the type actually held
    pub fn downcast<T: ?Sized + Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match self.instance.downcast_ref::<Arc<T>>() {
            Some(downcasted) => Ok(downcasted.clone()),
            None => Err(self.info.type_name),
        }
    }
}

/// A freshly built value which has not been shared yet.
///
/// Member injection mutates it in place before it gets sealed into an [Instance].
pub(crate) trait OwnedProduct: Send {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn seal(self: Box<Self>) -> Instance;
}

struct Owned<T>(T);
impl<T: Injectable> OwnedProduct for Owned<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.0
    }

    fn seal(self: Box<Self>) -> Instance {
        Instance::new(Arc::new(self.0))
    }
}

/// Output of a recipe
pub(crate) enum Product {
    /// Built by value, members can still be injected
    Owned(Box<dyn OwnedProduct>),
    /// Already shared, e.g. a factory returning `Arc<dyn Trait>`
    Shared(Instance),
}
impl Product {
    pub(crate) fn owned<T: Injectable>(value: T) -> Self {
        Product::Owned(Box::new(Owned(value)))
    }

    pub(crate) fn seal(self) -> Instance {
        match self {
            Product::Owned(owned) => owned.seal(),
            Product::Shared(instance) => instance,
        }
    }
}
