use std::{
    any::{type_name, Any},
    sync::Arc,
};

use crate::{
    descriptor::{Describe, TypeRef},
    errors::ResolveError,
    types::{Injectable, Instance, TypeInfo},
};

pub(crate) type Assign =
    Arc<dyn Fn(&mut dyn Any, Instance) -> Result<(), ResolveError> + Send + Sync + 'static>;

pub(crate) type ValueSource = Arc<dyn Fn() -> Result<Instance, ResolveError> + Send + Sync + 'static>;

/// An injectable field of a type
#[derive(Clone)]
pub struct Member {
    owner: TypeInfo,
    name: &'static str,
    target: TypeRef,
    assign: Assign,
}
impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("owner", &self.owner.type_name)
            .field("name", &self.name)
            .field("target", &self.target)
            .finish()
    }
}

impl Member {
    /// Declares member `name` of `T`, receiving a resolved `M`
    pub fn new<T, M, F>(name: &'static str, assign: F) -> Self
    where
        T: Injectable,
        M: ?Sized + Describe,
        F: Fn(&mut T, Arc<M>) + Send + Sync + 'static,
    {
        Member {
            owner: TypeInfo::of::<T>(),
            name,
            target: TypeRef::of::<M>(),
            assign: Arc::new(move |owner: &mut dyn Any, value: Instance| {
                let owner = owner
                    .downcast_mut::<T>()
                    .ok_or(ResolveError::DowncastFailed {
                        required_type: type_name::<T>(),
                        actual_type: "<member owner>",
                    })?;
                let value = value
                    .downcast::<M>()
                    .map_err(|actual_type| ResolveError::DowncastFailed {
                        required_type: type_name::<M>(),
                        actual_type,
                    })?;
                assign(owner, value);
                Ok(())
            }),
        }
    }

    /// Re-homes a member of an embedded base onto the type embedding it
    pub(crate) fn project<D, B>(self, project: fn(&mut D) -> &mut B) -> Member
    where
        D: Injectable,
        B: Injectable,
    {
        let base_assign = self.assign;
        Member {
            owner: TypeInfo::of::<D>(),
            name: self.name,
            target: self.target,
            assign: Arc::new(move |owner: &mut dyn Any, value: Instance| {
                let derived = owner
                    .downcast_mut::<D>()
                    .ok_or(ResolveError::DowncastFailed {
                        required_type: type_name::<D>(),
                        actual_type: "<member owner>",
                    })?;
                base_assign(project(derived) as &mut dyn Any, value)
            }),
        }
    }

    pub fn owner(&self) -> TypeInfo {
        self.owner
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn target(&self) -> TypeRef {
        self.target
    }

    pub(crate) fn assign(&self, owner: &mut dyn Any, value: Instance) -> Result<(), ResolveError> {
        (self.assign)(owner, value)
    }
}

/// Where a member's value comes from
#[derive(Clone)]
pub enum MemberSource {
    /// Resolve the member's type through the registry
    ByType,
    /// Use the supplied routine
    Explicit(ValueSource),
}

/// A member to inject, as part of a binding
#[derive(Clone)]
pub struct MemberSetter {
    pub(crate) member: Member,
    pub(crate) source: MemberSource,
}
impl std::fmt::Debug for MemberSetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self.source {
            MemberSource::ByType => "by type",
            MemberSource::Explicit(_) => "explicit",
        };
        f.debug_struct("MemberSetter")
            .field("member", &self.member)
            .field("source", &source)
            .finish()
    }
}

impl MemberSetter {
    pub fn by_type(member: Member) -> Self {
        MemberSetter {
            member,
            source: MemberSource::ByType,
        }
    }

    pub fn explicit<M, F>(member: Member, value: F) -> Self
    where
        M: ?Sized + Injectable,
        F: Fn() -> Arc<M> + Send + Sync + 'static,
    {
        MemberSetter {
            member,
            source: MemberSource::Explicit(Arc::new(move || Ok::<_, ResolveError>(Instance::new(value())))),
        }
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self.source, MemberSource::Explicit(_))
    }
}
