//! Turns a binding into a construction routine.
//!
//! Parameters are served by the compiled routines of their own bindings,
//! inlined into the caller, and every key pulled in along the way ends up
//! in the caller's dependency set.

use std::sync::{Arc, Weak};

use crate::{
    dependency_graph::DependencySet,
    descriptor::{recipe::RecipeCall, Upcast},
    errors::ResolveError,
    key::BindingKey,
    lifestyle::Routine,
    registry::RegistryInner,
    resolver::Resolver,
    types::{Instance, Product},
};

/// Routines compiled from one binding, before the lifestyle is applied
pub(crate) struct Compiled {
    /// Construction only, no member injection
    pub(crate) bare: Routine,
    /// Construction followed by member injection
    pub(crate) raw: Routine,
    pub(crate) dependencies: DependencySet,
}

pub(crate) fn compile(resolver: &Arc<Resolver>, registry: &Arc<RegistryInner>) -> Result<Compiled, ResolveError> {
    let binding = resolver.binding();
    let recipe = binding.recipe()?;

    let mut dependencies = DependencySet::new();
    let mut params = Vec::with_capacity(recipe.params().len());
    for param in recipe.params() {
        let dependency = registry.lookup(*param, BindingKey::of(param.info()))?;
        let plan = dependency.plan(registry)?;

        dependencies.insert(dependency.slot());
        dependencies.extend(plan.dependencies.iter().copied());
        params.push(plan.routine.clone());
    }
    // Member values are resolved on injection, only their keys are tracked
    dependencies.extend(
        binding
            .members
            .iter()
            .filter(|setter| !setter.is_explicit())
            .map(|setter| BindingKey::of(setter.member().target().info())),
    );

    let params: Arc<[Routine]> = params.into();
    let hook = (!binding.members.is_empty()).then(|| MemberHook {
        resolver: Arc::downgrade(resolver),
        registry: Arc::downgrade(registry),
    });

    Ok(Compiled {
        bare: assemble(recipe.call(), params.clone(), None, binding.upcast.clone()),
        raw: assemble(recipe.call(), params, hook, binding.upcast.clone()),
        dependencies,
    })
}

/// Injects the members of the resolver's binding into fresh products
struct MemberHook {
    resolver: Weak<Resolver>,
    registry: Weak<RegistryInner>,
}

impl MemberHook {
    fn inject(&self, product: &mut Product) -> Result<(), ResolveError> {
        let Product::Owned(owned) = product else {
            return Ok(());
        };
        let (Some(resolver), Some(registry)) = (self.resolver.upgrade(), self.registry.upgrade()) else {
            return Err(ResolveError::RegistryDropped);
        };
        resolver.inject_into(&registry, owned.as_any_mut())
    }
}

fn assemble(call: RecipeCall, params: Arc<[Routine]>, members: Option<MemberHook>, upcast: Option<Upcast>) -> Routine {
    Arc::new(move || -> Result<Instance, ResolveError> {
        let args = params.iter().map(|param| param()).collect::<Result<Vec<_>, _>>()?;
        let mut product = call(args)?;
        if let Some(members) = &members {
            members.inject(&mut product)?;
        }

        let instance = product.seal();
        match &upcast {
            Some(upcast) => upcast(instance),
            None => Ok(instance),
        }
    })
}
