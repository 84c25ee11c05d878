//! Binding descriptions: how one key gets produced.

use std::sync::Arc;

use crate::{
    catalog::TypeCatalog,
    descriptor::{
        member::MemberSetter,
        recipe::{Constructor, Recipe},
        Describe, TypeDescriptor, TypeKind, TypeRef, Upcast,
    },
    errors::BindingError,
    lifestyle::Lifestyle,
    types::{Injectable, TypeInfo},
};

/// Declarative recipe for producing a service
///
/// Unless told otherwise the product is the service type itself, built with
/// the constructor its descriptor prefers and injected with the members its
/// descriptor declares.
///
/// ```rust
/// use wrapp_binder::{BindingDescription, Recipe};
///
/// let binding = BindingDescription::new::<String>()
///     .with_factory(Recipe::new(|| "configured".to_string()))
///     .singleton();
/// assert!(binding.lifestyle().is_some());
/// ```
#[derive(Clone)]
pub struct BindingDescription {
    service: TypeRef,
    implementation: Option<TypeRef>,
    constructor: Option<Constructor>,
    factory: Option<Recipe>,
    lifestyle: Option<Lifestyle>,
    members: Vec<MemberSetter>,
    declared_members: bool,
}
impl std::fmt::Debug for BindingDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingDescription")
            .field("service", &self.service)
            .field("implementation", &self.implementation)
            .field("constructor", &self.constructor.is_some())
            .field("factory", &self.factory.is_some())
            .field("lifestyle", &self.lifestyle)
            .field("members", &self.members)
            .finish()
    }
}

impl BindingDescription {
    pub fn new<T: ?Sized + Describe>() -> Self {
        Self::of(TypeRef::of::<T>())
    }

    pub(crate) fn of(service: TypeRef) -> Self {
        BindingDescription {
            service,
            implementation: None,
            constructor: None,
            factory: None,
            lifestyle: None,
            members: Vec::new(),
            declared_members: true,
        }
    }

    /// Serve the service with the concrete type `C`
    pub fn to<C: Describe>(mut self) -> Self {
        self.implementation = Some(TypeRef::of::<C>());
        self
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn with_factory(mut self, factory: Recipe) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Always hand out `instance`
    pub fn with_instance<T: ?Sized + Describe>(self, instance: Arc<T>) -> Self {
        self.with_factory(Recipe::instance(instance))
    }

    pub fn with_lifestyle(mut self, lifestyle: Lifestyle) -> Self {
        self.lifestyle = Some(lifestyle);
        self
    }

    pub fn singleton(self) -> Self {
        self.with_lifestyle(Lifestyle::Singleton)
    }

    pub fn transient(self) -> Self {
        self.with_lifestyle(Lifestyle::Transient)
    }

    /// Adds a member setter, replacing a declared member of the same name
    pub fn with_member(mut self, setter: MemberSetter) -> Self {
        self.members.retain(|existing| existing.member().name() != setter.member().name());
        self.members.push(setter);
        self
    }

    /// Only inject the members added with [BindingDescription::with_member]
    pub fn without_declared_members(mut self) -> Self {
        self.declared_members = false;
        self
    }

    pub fn service(&self) -> TypeInfo {
        self.service.info()
    }

    pub fn lifestyle(&self) -> Option<&Lifestyle> {
        self.lifestyle.as_ref()
    }

    pub fn member_setters(&self) -> &[MemberSetter] {
        &self.members
    }

    pub(crate) fn service_ref(&self) -> TypeRef {
        self.service
    }

    /// Checks the description and resolves everything that does not need
    /// other bindings
    pub(crate) fn validate(self, catalog: &mut TypeCatalog) -> Result<Binding, BindingError> {
        let service = self.service;
        if self.constructor.is_some() && self.factory.is_some() {
            return Err(BindingError::ConflictingRecipe(service.info()));
        }

        let recipe = match (self.factory, self.constructor) {
            (Some(factory), _) => Some(factory),
            (None, Some(constructor)) => Some(constructor.recipe),
            (None, None) => None,
        };

        let product = match (&recipe, self.implementation) {
            (Some(recipe), Some(implementation)) if recipe.product() != implementation => {
                return Err(BindingError::RecipeMismatch {
                    service: service.info(),
                    implementation: implementation.info(),
                    product: recipe.output(),
                })
            }
            (Some(recipe), _) => recipe.product(),
            (None, Some(implementation)) => implementation,
            (None, None) => service,
        };
        let descriptor = catalog.describe(product);

        let upcast = if product == service {
            None
        } else {
            let ancestor = catalog
                .ancestor(&descriptor, service.info())
                .ok_or(BindingError::NotAssignable {
                    service: service.info(),
                    implementation: product.info(),
                })?;
            Some(ancestor.upcast)
        };

        let shared = recipe.as_ref().is_some_and(Recipe::is_shared);
        let mut members: Vec<MemberSetter> = Vec::new();
        if self.declared_members && !shared {
            members.extend(
                descriptor
                    .members()
                    .iter()
                    .filter(|declared| self.members.iter().all(|own| own.member().name() != declared.name()))
                    .cloned()
                    .map(MemberSetter::by_type),
            );
        }
        members.extend(self.members);

        if shared && !members.is_empty() {
            return Err(BindingError::MembersOnSharedProduct(service.info()));
        }
        for setter in &members {
            let member = setter.member();
            if member.owner() != product.info() {
                return Err(BindingError::MemberOwnerMismatch {
                    owner: member.owner(),
                    member: member.name(),
                    product: product.info(),
                });
            }
            if catalog.describe(member.target()).kind() == TypeKind::Value {
                return Err(BindingError::InvalidMemberTarget {
                    owner: member.owner(),
                    member: member.name(),
                    target: member.target().info(),
                });
            }
        }

        let lifestyle = self
            .lifestyle
            .or_else(|| descriptor.lifestyle().cloned())
            .unwrap_or_default();

        Ok(Binding {
            service,
            product_ref: product,
            product: descriptor,
            recipe,
            lifestyle,
            members,
            upcast,
        })
    }
}

/// A validated binding, owned by its resolver
pub(crate) struct Binding {
    pub(crate) service: TypeRef,
    product_ref: TypeRef,
    pub(crate) product: Arc<TypeDescriptor>,
    recipe: Option<Recipe>,
    pub(crate) lifestyle: Lifestyle,
    pub(crate) members: Vec<MemberSetter>,
    /// Converts the product into the service
    pub(crate) upcast: Option<Upcast>,
}

impl Binding {
    /// Binding serving exactly what `recipe` hands out
    pub(crate) fn of_recipe(recipe: Recipe, catalog: &mut TypeCatalog) -> Binding {
        let product = recipe.product();
        Binding {
            service: product,
            product_ref: product,
            product: catalog.describe(product),
            recipe: Some(recipe),
            lifestyle: Lifestyle::Transient,
            members: Vec::new(),
            upcast: None,
        }
    }

    /// Recipe building the product
    pub(crate) fn recipe(&self) -> Result<Recipe, BindingError> {
        if let Some(recipe) = &self.recipe {
            return Ok(recipe.clone());
        }

        let product = &self.product;
        if product.is_abstract() {
            return match product.implemented_by() {
                Some(implementation) => Ok(Recipe::forward(
                    implementation.target(),
                    self.product_ref,
                    implementation.upcast.clone(),
                )),
                None => Err(BindingError::UnresolvableInterface(product.info())),
            };
        }

        Constructor::select(product.constructors())
            .map(|constructor| constructor.recipe.clone())
            .ok_or(BindingError::NoAppropriateConstructor(product.info()))
    }

    pub(crate) fn product_info(&self) -> TypeInfo {
        self.product.info()
    }

    /// Product built by value, members can be injected into it
    pub(crate) fn is_owned_product<T: Injectable>(&self) -> bool {
        self.product.info() == TypeInfo::of::<T>()
            && self.recipe.as_ref().map_or(true, |recipe| !recipe.is_shared())
    }
}
