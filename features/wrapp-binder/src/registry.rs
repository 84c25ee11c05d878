//! The registry: registration, lookup and resolution.

use std::{
    any::type_name,
    cell::RefCell,
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use arc_swap::ArcSwap;
use parking_lot::ReentrantMutex;
use tracing::{debug, info, trace};

use crate::{
    binding::{Binding, BindingDescription},
    builder::RegistryBuilder,
    catalog::TypeCatalog,
    config::RegistryOptions,
    dependency_graph::{DependencyGraph, DependencySet},
    descriptor::{
        recipe::{Recipe, RecipeCall},
        Describe, TypeDescriptor, TypeRef, Upcast,
    },
    errors::{BindingError, ResolveError},
    generics::{Closed, OpenGenericBinding, OpenGenericIndex},
    implicit::ImplicitIndex,
    key::BindingKey,
    lifestyle::Lifestyle,
    resolver::Resolver,
    types::{Injectable, Instance, Product, TypeInfo},
};

type Snapshot = HashMap<BindingKey, Arc<Resolver>>;

/// Entry point for registering and resolving bindings
///
/// Cheap to clone, clones share the same bindings. Resolving a compiled
/// binding never takes a lock; registration and compilation are serialized.
///
/// ```rust
/// use std::sync::Arc;
/// use wrapp_binder::{BindingDescription, Describe, Recipe, Registry, TypeDescriptor};
///
/// struct Greeting(String);
/// impl Describe for Greeting {
///     fn describe() -> TypeDescriptor {
///         TypeDescriptor::concrete::<Greeting>()
///             .construct_with(|name: Arc<String>| Greeting(format!("hello {name}")))
///             .build()
///     }
/// }
///
/// let registry = Registry::new();
/// registry
///     .register(BindingDescription::new::<String>().with_instance(Arc::new("world".to_string())))
///     .unwrap();
///
/// assert_eq!(registry.resolve::<Greeting>().unwrap().0, "hello world");
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}
impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.snapshot.load();
        let mut map = f.debug_map();
        for (key, resolver) in snapshot.iter() {
            let state = if resolver.compiled().is_some() {
                "compiled"
            } else {
                "unconfigured"
            };
            map.entry(&key.to_string(), &state);
        }
        map.finish()
    }
}
impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Describe for Registry {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Registry>().build()
    }
}

pub(crate) struct RegistryInner {
    /// The one coarse lock, re-entrant so user code running inside a compile can resolve
    lock: ReentrantMutex<RefCell<RegistryState>>,
    /// Published copy of the resolver map, for lock free reads
    snapshot: ArcSwap<Snapshot>,
    options: RegistryOptions,
    started: AtomicBool,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        let inner = Arc::new_cyclic(|this: &Weak<RegistryInner>| {
            let mut state = RegistryState::default();
            state.bind_self(this.clone());
            RegistryInner {
                snapshot: ArcSwap::from_pointee(state.resolvers.clone()),
                lock: ReentrantMutex::new(RefCell::new(state)),
                options,
                started: AtomicBool::new(false),
            }
        });
        Registry { inner }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.inner.options
    }

    /// Descriptor of `T`, cached by this registry
    ///
    /// Describing a closed generic type up front makes it available for
    /// open generic bindings.
    pub fn describe<T: ?Sized + Describe>(&self) -> Arc<TypeDescriptor> {
        self.describe_type(TypeRef::of::<T>())
    }

    pub fn describe_type(&self, ty: TypeRef) -> Arc<TypeDescriptor> {
        self.inner.with_state(|state| state.catalog.describe(ty))
    }

    /// Binds the service of `binding`, replacing any earlier binding
    ///
    /// Plans that inlined the replaced binding are cleared and recompile on
    /// their next use.
    pub fn register(&self, binding: BindingDescription) -> Result<(), BindingError> {
        let slot = BindingKey::of(binding.service());
        self.inner.register(slot, binding)
    }

    /// Binds the service of `binding` under `qualifier`
    pub fn register_named(&self, qualifier: &'static str, binding: BindingDescription) -> Result<(), BindingError> {
        let slot = BindingKey::named(binding.service(), qualifier);
        self.inner.register(slot, binding)
    }

    pub fn register_open_generic(&self, binding: OpenGenericBinding) -> Result<(), BindingError> {
        let service = binding.service();
        self.inner.check_not_frozen(|| {
            BindingError::RegistrationFrozen(TypeInfo {
                type_name: service.name,
                type_id: service.id,
            })
        })?;
        binding.check()?;
        self.inner.with_state(|state| state.register_open_generic(binding));
        Ok(())
    }

    pub fn resolve<T: ?Sized + Describe>(&self) -> Result<Arc<T>, ResolveError> {
        downcast(self.resolve_type(TypeRef::of::<T>())?)
    }

    pub fn resolve_named<T: ?Sized + Describe>(&self, qualifier: &'static str) -> Result<Arc<T>, ResolveError> {
        let ty = TypeRef::of::<T>();
        let key = BindingKey::named(ty.info(), qualifier);
        downcast(self.inner.resolve_key(ty, key, false)?)
    }

    pub fn resolve_type(&self, ty: TypeRef) -> Result<Instance, ResolveError> {
        self.inner.resolve_key(ty, BindingKey::of(ty.info()), false)
    }

    /// Injects the members of an instance built elsewhere
    ///
    /// Uses the member setters of the binding for `T` when it builds `T`
    /// itself, otherwise the members declared by `T`'s descriptor.
    pub fn inject_members<T: Describe>(&self, mut instance: T) -> Result<T, ResolveError> {
        self.inner.mark_started();
        let resolver = self.inner.with_state(|state| state.members_resolver::<T>())?;
        resolver.inject_into(&self.inner, &mut instance)?;
        Ok(instance)
    }

    /// Compiles every binding now, returning the first configuration error
    pub fn verify(&self) -> Result<(), ResolveError> {
        self.inner.mark_started();
        let _serial = self.inner.lock.lock();

        let resolvers = self.inner.with_state(|state| state.in_registration_order());
        for resolver in &resolvers {
            resolver.plan(&self.inner)?;
            for setter in resolver.binding().members.iter().filter(|setter| !setter.is_explicit()) {
                let target = setter.member().target();
                let member = self.inner.lookup(target, BindingKey::of(target.info()))?;
                member.plan(&self.inner)?;
            }
        }

        info!("Verified {} bindings", resolvers.len());
        Ok(())
    }

    /// Keys inlined into the compiled plan of `T`, `None` if it is not compiled
    pub fn dependencies_of<T: ?Sized + Describe>(&self) -> Option<Vec<BindingKey>> {
        let slot = BindingKey::of(TypeInfo::of::<T>());
        let recorded = self
            .inner
            .with_state(|state| state.graph.dependencies_of(slot).cloned())?;

        let mut dependencies: Vec<BindingKey> = recorded.into_iter().collect();
        dependencies.sort_by_key(|key| key.to_string());
        Some(dependencies)
    }

    pub fn is_compiled<T: ?Sized + Describe>(&self) -> bool {
        self.inner
            .snapshot
            .load()
            .get(&BindingKey::of(TypeInfo::of::<T>()))
            .is_some_and(|resolver| resolver.compiled().is_some())
    }
}

fn downcast<T: ?Sized + Injectable>(instance: Instance) -> Result<Arc<T>, ResolveError> {
    instance
        .downcast::<T>()
        .map_err(|actual_type| ResolveError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        })
}

impl RegistryInner {
    /// Runs `f` on the state, publishing the resolver map if `f` changed it
    ///
    /// `f` must not call back into the registry.
    fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        let guard = self.lock.lock();
        let mut state = guard.borrow_mut();
        let result = f(&mut state);
        if std::mem::take(&mut state.dirty) {
            self.snapshot.store(Arc::new(state.resolvers.clone()));
        }
        result
    }

    fn mark_started(&self) {
        if !self.started.load(Ordering::Relaxed) {
            self.started.store(true, Ordering::Relaxed);
        }
    }

    fn check_not_frozen(&self, error: impl FnOnce() -> BindingError) -> Result<(), BindingError> {
        if self.options.freeze_after_first_resolve && self.started.load(Ordering::Relaxed) {
            return Err(error());
        }
        Ok(())
    }

    fn register(&self, slot: BindingKey, binding: BindingDescription) -> Result<(), BindingError> {
        let service = binding.service();
        if service == TypeInfo::of::<Registry>() {
            return Err(BindingError::SelfBinding(service));
        }
        self.check_not_frozen(|| BindingError::RegistrationFrozen(service))?;

        self.with_state(|state| state.register(slot, binding))
    }

    pub(crate) fn lookup(&self, ty: TypeRef, key: BindingKey) -> Result<Arc<Resolver>, BindingError> {
        self.with_state(|state| state.lookup(ty, key, &self.options))
    }

    fn resolve_key(self: &Arc<Self>, ty: TypeRef, key: BindingKey, allow_bare: bool) -> Result<Instance, ResolveError> {
        self.mark_started();

        let cached = self
            .snapshot
            .load()
            .get(&key)
            .and_then(|resolver| resolver.compiled());
        if let Some(plan) = cached {
            return (plan.routine)();
        }

        let routine = {
            let _serial = self.lock.lock();
            let resolver = self.lookup(ty, key)?;
            match resolver.bare() {
                Some(bare) if allow_bare && resolver.is_compiling() => {
                    trace!("'{}' is still being built, using its bare product", resolver.key());
                    bare.routine.clone()
                }
                _ => resolver.plan(self)?.routine.clone(),
            }
        };
        routine()
    }

    /// Value for a member of type `ty`
    pub(crate) fn resolve_member(self: &Arc<Self>, ty: TypeRef) -> Result<Instance, ResolveError> {
        self.resolve_key(ty, BindingKey::of(ty.info()), true)
    }

    pub(crate) fn compile_chain(&self) -> Vec<TypeInfo> {
        self.with_state(|state| state.compiling.iter().map(|resolver| resolver.key().info()).collect())
    }

    pub(crate) fn enter_compile(&self, resolver: &Arc<Resolver>) {
        self.with_state(|state| state.compiling.push(resolver.clone()));
    }

    pub(crate) fn leave_compile(&self) {
        self.with_state(|state| state.compiling.pop());
    }

    pub(crate) fn record(&self, slot: BindingKey, dependencies: &DependencySet) {
        self.with_state(|state| state.graph.record(slot, dependencies));
    }
}

#[derive(Default)]
struct RegistryState {
    resolvers: HashMap<BindingKey, Arc<Resolver>>,
    /// Slots in the order they were bound
    order: Vec<BindingKey>,
    catalog: TypeCatalog,
    implicit: ImplicitIndex,
    generics: OpenGenericIndex,
    graph: DependencyGraph,
    /// Resolvers being compiled, outermost first
    compiling: Vec<Arc<Resolver>>,
    /// Resolvers changed since the last publish
    dirty: bool,
}

impl RegistryState {
    /// Resolving the registry hands out a handle to itself
    fn bind_self(&mut self, registry: Weak<RegistryInner>) {
        let call: RecipeCall = Arc::new(move |_: Vec<Instance>| {
            let inner = registry.upgrade().ok_or(ResolveError::RegistryDropped)?;
            Ok(Product::Shared(Instance::new(Arc::new(Registry { inner }))))
        });
        let binding = Binding::of_recipe(Recipe::from_call(TypeRef::of::<Registry>(), call), &mut self.catalog);

        let slot = BindingKey::of(TypeInfo::of::<Registry>());
        self.insert(slot, Resolver::new(slot, false, binding));
    }

    fn insert(&mut self, slot: BindingKey, resolver: Arc<Resolver>) {
        self.dirty = true;
        match self.resolvers.insert(slot, resolver) {
            Some(replaced) => {
                replaced.clear();
                self.graph.forget(slot);
                self.invalidate(slot);
            }
            None => self.order.push(slot),
        }
    }

    /// Clears every plan that inlined `changed`
    ///
    /// Compiles still in flight have not recorded what they inlined yet, so
    /// they are all told to compile again before publishing.
    fn invalidate(&mut self, changed: BindingKey) {
        for dependent in self.graph.take_dependents(changed) {
            if let Some(resolver) = self.resolvers.get(&dependent) {
                debug!("Invalidated '{}' after '{}' changed", resolver.key(), changed);
                resolver.clear();
            }
        }
        for resolver in &self.compiling {
            resolver.mark_stale();
        }
    }

    /// Drops a discovered binding so it is discovered again
    fn remove_implicit(&mut self, slot: BindingKey) {
        if !self.resolvers.get(&slot).is_some_and(|resolver| resolver.is_implicit()) {
            return;
        }
        if let Some(removed) = self.resolvers.remove(&slot) {
            debug!("Dropped stale '{}'", removed.key());
            removed.clear();
        }
        self.order.retain(|existing| *existing != slot);
        self.graph.forget(slot);
        self.invalidate(slot);
        self.dirty = true;
    }

    fn register(&mut self, slot: BindingKey, description: BindingDescription) -> Result<(), BindingError> {
        let service = description.service_ref();
        let binding = description.validate(&mut self.catalog)?;
        let concrete =
            slot.qualifier().is_none() && binding.product_info() == service.info() && !binding.product.is_abstract();

        let resolver = Resolver::new(slot, false, binding);
        debug!("Registered '{}'", resolver.key());
        self.insert(slot, resolver);
        if concrete {
            self.index(service);
        }
        Ok(())
    }

    fn register_open_generic(&mut self, binding: OpenGenericBinding) {
        let definition = binding.service();
        debug!("Registered open generic {} -> {}", definition, binding.implementation());
        if self.generics.insert(binding).is_none() {
            return;
        }

        // Closures of the replaced template
        let mut stale = Vec::new();
        for (slot, resolver) in &self.resolvers {
            if !resolver.is_implicit() {
                continue;
            }
            let service = self.catalog.describe(resolver.binding().service);
            if service.generic().is_some_and(|generic| generic.definition == definition) {
                stale.push(*slot);
            }
        }
        for slot in stale {
            self.remove_implicit(slot);
        }
    }

    /// Makes `concrete` an implicit candidate of its ancestors
    fn index(&mut self, concrete: TypeRef) {
        let descriptor = self.catalog.describe(concrete);
        let ancestors = self.catalog.ancestors_of(&descriptor);
        let ancestors: Vec<_> = ancestors
            .into_iter()
            .filter(|ancestor| self.catalog.describe(ancestor.target()).implemented_by().is_none())
            .collect();

        for changed in self.implicit.add(concrete, ancestors) {
            // A discovered binding for the ancestor may now be ambiguous
            self.remove_implicit(BindingKey::of(changed));
        }
    }

    fn lookup(&mut self, ty: TypeRef, key: BindingKey, options: &RegistryOptions) -> Result<Arc<Resolver>, BindingError> {
        if let Some(resolver) = self.resolvers.get(&key) {
            return Ok(resolver.clone());
        }
        if key.qualifier().is_some() || key.is_member() {
            return Err(BindingError::NotRegistered(key.to_string()));
        }

        let descriptor = self.catalog.describe(ty);
        if let Some(template) = self.generics.template_for(&descriptor).cloned() {
            let closed = template.close(&descriptor, &mut self.catalog)?;
            return self.bind_closed(ty, key, closed);
        }

        if let Some(implementation) = descriptor.implemented_by() {
            return Ok(self.bind_alias(ty, key, implementation.target(), implementation.upcast.clone()));
        }

        let candidates = self.implicit.candidates(ty.info()).to_vec();
        match candidates.as_slice() {
            [] => {}
            [candidate] => return Ok(self.bind_alias(ty, key, candidate.concrete, candidate.upcast.clone())),
            _ => {
                return Err(BindingError::AmbiguousBinding {
                    service: ty.info(),
                    candidates: candidates.iter().map(|candidate| candidate.concrete.info()).collect(),
                })
            }
        }

        if descriptor.is_abstract() {
            return Err(BindingError::UnresolvableInterface(ty.info()));
        }
        if !options.auto_bind {
            return Err(BindingError::NotRegistered(key.to_string()));
        }

        let binding = BindingDescription::of(ty).validate(&mut self.catalog)?;
        let resolver = Resolver::new(key, true, binding);
        debug!("Auto-bound '{}'", resolver.key());
        self.insert(key, resolver.clone());
        self.index(ty);
        Ok(resolver)
    }

    /// Serves `ty` by resolving `target` and upcasting it
    fn bind_alias(&mut self, ty: TypeRef, key: BindingKey, target: TypeRef, upcast: Upcast) -> Arc<Resolver> {
        let binding = Binding::of_recipe(Recipe::forward(target, ty, upcast), &mut self.catalog);
        let resolver = Resolver::new(key, true, binding);
        debug!("Implicitly bound '{}' to '{}'", resolver.key(), target.info());
        self.insert(key, resolver.clone());
        resolver
    }

    fn bind_closed(&mut self, ty: TypeRef, key: BindingKey, closed: Closed) -> Result<Arc<Resolver>, BindingError> {
        let implementation = closed.implementation;
        let implementation_key = BindingKey::of(implementation.info());

        if let Some(upcast) = closed.upcast {
            if !self.resolvers.contains_key(&implementation_key) {
                self.bind_generic_implementation(implementation, implementation_key, closed.lifestyle)?;
            }
            return Ok(self.bind_alias(ty, key, implementation, upcast));
        }
        self.bind_generic_implementation(implementation, key, closed.lifestyle)
    }

    fn bind_generic_implementation(
        &mut self,
        implementation: TypeRef,
        key: BindingKey,
        lifestyle: Option<Lifestyle>,
    ) -> Result<Arc<Resolver>, BindingError> {
        let mut description = BindingDescription::of(implementation);
        if let Some(lifestyle) = lifestyle {
            description = description.with_lifestyle(lifestyle);
        }
        let binding = description.validate(&mut self.catalog)?;

        let resolver = Resolver::new(key, true, binding);
        debug!("Bound closed generic '{}'", resolver.key());
        self.insert(key, resolver.clone());
        self.index(implementation);
        Ok(resolver)
    }

    /// Resolver whose member plan fits instances of `T`
    fn members_resolver<T: Describe>(&mut self) -> Result<Arc<Resolver>, BindingError> {
        let info = TypeInfo::of::<T>();
        if let Some(resolver) = self.resolvers.get(&BindingKey::of(info)) {
            if resolver.binding().is_owned_product::<T>() {
                return Ok(resolver.clone());
            }
        }

        let slot = BindingKey::members_of(info);
        if let Some(resolver) = self.resolvers.get(&slot) {
            return Ok(resolver.clone());
        }

        // Never compiled, so kept out of the registration order
        let binding = BindingDescription::new::<T>().validate(&mut self.catalog)?;
        let resolver = Resolver::new(slot, false, binding);
        self.resolvers.insert(slot, resolver.clone());
        self.dirty = true;
        Ok(resolver)
    }

    fn in_registration_order(&self) -> Vec<Arc<Resolver>> {
        self.order
            .iter()
            .filter_map(|slot| self.resolvers.get(slot).cloned())
            .collect()
    }
}
