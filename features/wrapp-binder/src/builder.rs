use crate::{
    binding::BindingDescription,
    config::RegistryOptions,
    descriptor::{Describe, TypeRef},
    errors::{BindingError, ResolveError},
    generics::OpenGenericBinding,
    registry::Registry,
};

//////////////////////////////////////////////////////////////////////
///
/// Setting up a registry has two parts.
/// 1. The RegistryBuilder where one collects options, descriptors and bindings
/// 2. `build` to get the Registry, or `build_verified` to also compile every binding

pub struct RegistryBuilder {
    options: RegistryOptions,
    /// Types described before any binding is registered
    described: Vec<TypeRef>,
    /// Registrations, applied in order
    registrations: Vec<Registration>,
}
enum Registration {
    Plain(BindingDescription),
    Named(&'static str, BindingDescription),
    OpenGeneric(OpenGenericBinding),
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder {
            options: RegistryOptions::default(),
            described: Vec::new(),
            registrations: Vec::new(),
        }
    }
}
impl RegistryBuilder {
    pub fn options(mut self, options: RegistryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn freeze_after_first_resolve(mut self, freeze: bool) -> Self {
        self.options.freeze_after_first_resolve = freeze;
        self
    }

    pub fn auto_bind(mut self, auto_bind: bool) -> Self {
        self.options.auto_bind = auto_bind;
        self
    }

    /// Describes `T` up front, e.g. a closed generic an open binding should find
    pub fn describe<T: ?Sized + Describe>(mut self) -> Self {
        self.described.push(TypeRef::of::<T>());
        self
    }

    pub fn register(mut self, binding: BindingDescription) -> Self {
        self.registrations.push(Registration::Plain(binding));
        self
    }

    pub fn register_named(mut self, qualifier: &'static str, binding: BindingDescription) -> Self {
        self.registrations.push(Registration::Named(qualifier, binding));
        self
    }

    pub fn register_open_generic(mut self, binding: OpenGenericBinding) -> Self {
        self.registrations.push(Registration::OpenGeneric(binding));
        self
    }

    /// Builds the registry, failing on the first invalid registration
    pub fn build(self) -> Result<Registry, BindingError> {
        let registry = Registry::with_options(self.options);
        for ty in self.described {
            registry.describe_type(ty);
        }

        for registration in self.registrations {
            match registration {
                Registration::Plain(binding) => registry.register(binding)?,
                Registration::Named(qualifier, binding) => registry.register_named(qualifier, binding)?,
                Registration::OpenGeneric(binding) => registry.register_open_generic(binding)?,
            }
        }
        Ok(registry)
    }

    /// Builds the registry and compiles every binding
    pub fn build_verified(self) -> Result<Registry, ResolveError> {
        let registry = self.build()?;
        registry.verify()?;
        Ok(registry)
    }
}
