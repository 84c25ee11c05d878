//! Per binding state: compiled plan, dependency set and recursion guard.

use std::{any::Any, sync::Arc};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    binding::Binding,
    compiler,
    dependency_graph::DependencySet,
    errors::{BindingError, ResolveError},
    key::BindingKey,
    lifestyle::Routine,
    registry::RegistryInner,
};

pub(crate) mod members;

use members::MemberPlan;

/// A callable routine with the keys inlined into it
pub(crate) struct Plan {
    pub(crate) routine: Routine,
    pub(crate) dependencies: Arc<DependencySet>,
}

#[derive(Default)]
struct ResolverState {
    /// Recursion guard
    compiling: bool,
    /// Bumped by every clear, a compile only publishes into the generation it started in
    generation: u64,
    /// A binding changed while compiling, what was inlined may be gone
    stale: bool,
}

/// Owns one binding and everything compiled from it
///
/// `Unconfigured -> Compiling -> Compiled`, and back to `Unconfigured` when a
/// key it inlined is rebound. Compiled plans are read without locking.
pub(crate) struct Resolver {
    key: BindingKey,
    slot: BindingKey,
    binding: Binding,
    compiled: ArcSwapOption<Plan>,
    /// Construction without members or lifestyle, published while compiling
    bare: ArcSwapOption<Plan>,
    members: ArcSwapOption<MemberPlan>,
    state: Mutex<ResolverState>,
}
impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("key", &self.key)
            .field("compiled", &self.compiled.load().is_some())
            .finish()
    }
}

impl Resolver {
    /// Resolver stored under `slot`, flagged as implicit when discovered
    pub(crate) fn new(slot: BindingKey, implicit: bool, binding: Binding) -> Arc<Self> {
        let key = if implicit { slot.as_implicit() } else { slot };
        Arc::new(Resolver {
            key,
            slot,
            binding,
            compiled: ArcSwapOption::empty(),
            bare: ArcSwapOption::empty(),
            members: ArcSwapOption::empty(),
            state: Mutex::default(),
        })
    }

    pub(crate) fn key(&self) -> BindingKey {
        self.key
    }

    /// Key the resolver is stored and looked up under
    pub(crate) fn slot(&self) -> BindingKey {
        self.slot
    }

    pub(crate) fn is_implicit(&self) -> bool {
        self.key.is_implicit()
    }

    pub(crate) fn binding(&self) -> &Binding {
        &self.binding
    }

    pub(crate) fn compiled(&self) -> Option<Arc<Plan>> {
        self.compiled.load_full()
    }

    pub(crate) fn bare(&self) -> Option<Arc<Plan>> {
        self.bare.load_full()
    }

    pub(crate) fn is_compiling(&self) -> bool {
        self.state.lock().compiling
    }

    /// Compiled plan, compiling it first if needed
    ///
    /// Must be called with the registry lock held.
    pub(crate) fn plan(self: &Arc<Self>, registry: &Arc<RegistryInner>) -> Result<Arc<Plan>, ResolveError> {
        if let Some(plan) = self.compiled() {
            return Ok(plan);
        }

        let generation = {
            let mut state = self.state.lock();
            if state.compiling {
                drop(state);
                let mut chain = registry.compile_chain();
                chain.push(self.key.info());
                return Err(BindingError::RecursionDetected {
                    key: self.key.info(),
                    chain,
                }
                .into());
            }
            state.compiling = true;
            state.stale = false;
            state.generation
        };

        registry.enter_compile(self);
        let result = self.build(registry, generation);
        registry.leave_compile();
        self.state.lock().compiling = false;

        if result.is_err() {
            self.bare.store(None);
        }
        result
    }

    fn build(self: &Arc<Self>, registry: &Arc<RegistryInner>, generation: u64) -> Result<Arc<Plan>, ResolveError> {
        let plan = loop {
            let compiled = compiler::compile(self, registry)?;
            if self.take_stale() {
                debug!("'{}' lost a dependency while compiling, compiling again", self.key);
                continue;
            }
            let dependencies = Arc::new(compiled.dependencies);

            self.bare.store(Some(Arc::new(Plan {
                routine: compiled.bare,
                dependencies: dependencies.clone(),
            })));
            // Singletons run here, with the guard still set
            let routine = self.binding.lifestyle.wrap(compiled.raw)?;
            if self.take_stale() {
                debug!("'{}' lost a dependency while compiling, compiling again", self.key);
                continue;
            }
            break Arc::new(Plan { routine, dependencies });
        };

        if self.state.lock().generation != generation {
            debug!("'{}' changed while compiling, not caching", self.key);
            return Ok(plan);
        }
        self.compiled.store(Some(plan.clone()));
        registry.record(self.slot, &plan.dependencies);
        debug!(
            "Compiled '{}' with {} dependencies ({:?})",
            self.key,
            plan.dependencies.len(),
            self.binding.lifestyle
        );
        Ok(plan)
    }

    /// Marks an in-flight compile as built from bindings that changed
    pub(crate) fn mark_stale(&self) {
        self.state.lock().stale = true;
    }

    fn take_stale(&self) -> bool {
        std::mem::take(&mut self.state.lock().stale)
    }

    /// Back to unconfigured, recompiled lazily on next use
    pub(crate) fn clear(&self) {
        let mut state = self.state.lock();
        state.compiling = false;
        state.generation += 1;
        self.compiled.store(None);
        self.bare.store(None);
        self.members.store(None);
    }

    /// Member plan, compiled on first use
    pub(crate) fn member_plan(&self, registry: &Arc<RegistryInner>) -> Arc<MemberPlan> {
        if let Some(plan) = self.members.load_full() {
            return plan;
        }
        let plan = Arc::new(MemberPlan::compile(
            self.binding.product_info(),
            &self.binding.members,
            registry,
        ));
        self.members.store(Some(plan.clone()));
        plan
    }

    pub(crate) fn inject_into(&self, registry: &Arc<RegistryInner>, target: &mut dyn Any) -> Result<(), ResolveError> {
        let plan = self.member_plan(registry);
        if plan.is_empty() {
            return Ok(());
        }
        plan.inject(target)
    }
}
