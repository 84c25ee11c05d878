//! Binding descriptors: what the engine knows about a type.
//!
//! A descriptor is built once per type by [Describe::describe] and cached by
//! the registry. It is plain data, so it can be written by hand, by a macro
//! or by code generation.

use std::{any::type_name, marker::PhantomData, sync::Arc};

use crate::{
    errors::ResolveError,
    lifestyle::Lifestyle,
    types::{Injectable, Instance, TypeInfo},
};

pub mod generic;
pub mod member;
mod primitives;
pub mod recipe;

use generic::{GenericDef, GenericInstance};
use member::Member;
use recipe::{Constructor, Recipe, RecipeFn};

pub(crate) type Upcast =
    Arc<dyn Fn(Instance) -> Result<Instance, ResolveError> + Send + Sync + 'static>;

/// Types the engine can bind and resolve
pub trait Describe: Injectable {
    fn describe() -> TypeDescriptor;
}

/// A describable type, carried around by value
#[derive(Clone, Copy)]
pub struct TypeRef {
    info: TypeInfo,
    describe: fn() -> TypeDescriptor,
}
impl std::fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.info.type_name)
    }
}
impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
    }
}
impl Eq for TypeRef {}

impl TypeRef {
    pub fn of<T: ?Sized + Describe>() -> TypeRef {
        TypeRef {
            info: TypeInfo::of::<T>(),
            describe: <T as Describe>::describe,
        }
    }

    pub fn info(&self) -> TypeInfo {
        self.info
    }

    pub(crate) fn describe(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Concrete,
    /// Interfaces and abstract bases, usually a `dyn Trait`
    Abstract,
    /// Plain values, never valid member targets
    Value,
}

/// An interface or abstract base a type can be converted into
#[derive(Clone)]
pub struct Ancestor {
    pub(crate) target: TypeRef,
    pub(crate) upcast: Upcast,
}
impl std::fmt::Debug for Ancestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Ancestor").field(&self.target).finish()
    }
}

impl Ancestor {
    fn new<C, I>(upcast: fn(Arc<C>) -> Arc<I>) -> Self
    where
        C: ?Sized + Injectable,
        I: ?Sized + Describe,
    {
        Ancestor {
            target: TypeRef::of::<I>(),
            upcast: upcast_with(upcast),
        }
    }

    pub fn target(&self) -> TypeRef {
        self.target
    }

    /// Chains `self` after `first`
    pub(crate) fn after(&self, first: &Upcast) -> Ancestor {
        let first = first.clone();
        let then = self.upcast.clone();
        Ancestor {
            target: self.target,
            upcast: Arc::new(move |instance: Instance| then(first(instance)?)),
        }
    }
}

fn upcast_with<C, I>(upcast: fn(Arc<C>) -> Arc<I>) -> Upcast
where
    C: ?Sized + Injectable,
    I: ?Sized + Injectable,
{
    Arc::new(move |instance: Instance| {
        let concrete = instance
            .downcast::<C>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                required_type: type_name::<C>(),
                actual_type,
            })?;
        Ok(Instance::new(upcast(concrete)))
    })
}

/// Everything the engine knows about one type
#[derive(Clone)]
pub struct TypeDescriptor {
    pub(crate) info: TypeInfo,
    pub(crate) kind: TypeKind,
    pub(crate) constructors: Vec<Constructor>,
    pub(crate) members: Vec<Member>,
    pub(crate) ancestors: Vec<Ancestor>,
    pub(crate) implemented_by: Option<Ancestor>,
    pub(crate) lifestyle: Option<Lifestyle>,
    pub(crate) generic: Option<GenericInstance>,
}
impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("info", &self.info.type_name)
            .field("kind", &self.kind)
            .field("constructors", &self.constructors.len())
            .field("members", &self.members)
            .field("ancestors", &self.ancestors)
            .field("generic", &self.generic)
            .finish()
    }
}

impl TypeDescriptor {
    pub fn concrete<T: Injectable>() -> Descriptor<T> {
        Descriptor::new(TypeKind::Concrete)
    }

    pub fn value<T: Injectable>() -> Descriptor<T> {
        Descriptor::new(TypeKind::Value)
    }

    /// Descriptor of an interface or abstract base
    pub fn interface<T: ?Sized + Injectable>() -> Descriptor<T> {
        Descriptor::new(TypeKind::Abstract)
    }

    pub fn info(&self) -> TypeInfo {
        self.info
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.kind == TypeKind::Abstract
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Injectable members, inherited ones included
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Directly declared ancestors
    pub fn ancestors(&self) -> &[Ancestor] {
        &self.ancestors
    }

    pub fn implemented_by(&self) -> Option<&Ancestor> {
        self.implemented_by.as_ref()
    }

    /// Lifestyle requested by the type itself
    pub fn lifestyle(&self) -> Option<&Lifestyle> {
        self.lifestyle.as_ref()
    }

    pub fn generic(&self) -> Option<&GenericInstance> {
        self.generic.as_ref()
    }
}

/// Typed builder for a [TypeDescriptor]
pub struct Descriptor<T: ?Sized> {
    descriptor: TypeDescriptor,
    inherited: Vec<Member>,
    _type: PhantomData<fn(&T)>,
}

impl<T: ?Sized + Injectable> Descriptor<T> {
    fn new(kind: TypeKind) -> Self {
        Descriptor {
            descriptor: TypeDescriptor {
                info: TypeInfo::of::<T>(),
                kind,
                constructors: Vec::new(),
                members: Vec::new(),
                ancestors: Vec::new(),
                implemented_by: None,
                lifestyle: None,
                generic: None,
            },
            inherited: Vec::new(),
            _type: PhantomData,
        }
    }

    /// `T` implements or extends `I`
    pub fn implements<I: ?Sized + Describe>(mut self, upcast: fn(Arc<T>) -> Arc<I>) -> Self {
        self.descriptor.ancestors.push(Ancestor::new(upcast));
        self
    }

    /// Requests for `T` are served by `C`
    pub fn implemented_by<C: Describe>(mut self, upcast: fn(Arc<C>) -> Arc<T>) -> Self {
        self.descriptor.implemented_by = Some(Ancestor {
            target: TypeRef::of::<C>(),
            upcast: upcast_with(upcast),
        });
        self
    }

    /// `T` is the instantiation of `definition` with `args`
    pub fn generic(mut self, definition: GenericDef, args: Vec<TypeInfo>) -> Self {
        self.descriptor.generic = Some(GenericInstance { definition, args });
        self
    }

    pub fn build(self) -> TypeDescriptor {
        let Descriptor {
            mut descriptor,
            inherited,
            ..
        } = self;

        // Members redeclared by `T` shadow the base ones
        let mut members: Vec<Member> = inherited
            .into_iter()
            .filter(|base| descriptor.members.iter().all(|own| own.name() != base.name()))
            .collect();
        members.append(&mut descriptor.members);
        descriptor.members = members;

        descriptor
    }
}

impl<T: Injectable> Descriptor<T> {
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.descriptor.constructors.push(constructor);
        self
    }

    /// Shorthand for a plain constructor
    pub fn construct_with<Args, F: RecipeFn<Args, T>>(self, f: F) -> Self
    where
        T: Describe,
    {
        self.constructor(Constructor::new(Recipe::new(f)))
    }

    /// Injectable member `name`, receiving a resolved `M`
    pub fn member<M, F>(mut self, name: &'static str, assign: F) -> Self
    where
        M: ?Sized + Describe,
        F: Fn(&mut T, Arc<M>) + Send + Sync + 'static,
    {
        self.descriptor.members.push(Member::new(name, assign));
        self
    }

    /// `T` embeds `B` and inherits its injectable members
    pub fn inherits<B: Describe>(mut self, project: fn(&mut T) -> &mut B) -> Self {
        let base = B::describe();
        self.inherited
            .extend(base.members.into_iter().map(|member| member.project(project)));
        self
    }

    pub fn singleton(self) -> Self {
        self.lifestyle(Lifestyle::Singleton)
    }

    pub fn lifestyle(mut self, lifestyle: Lifestyle) -> Self {
        self.descriptor.lifestyle = Some(lifestyle);
        self
    }
}
