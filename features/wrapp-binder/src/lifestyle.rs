//! Caching policies applied to compiled routines.

use std::{
    cell::RefCell,
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use crate::{errors::ResolveError, types::Instance};

static NEXT_CACHE: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Per-thread instances by cache id, dropped when the thread exits
    static PER_THREAD: RefCell<HashMap<u64, (Weak<()>, Instance)>> = RefCell::new(HashMap::new());
}

/// A callable construction routine
pub type Routine = Arc<dyn Fn() -> Result<Instance, ResolveError> + Send + Sync + 'static>;

type Wrapper = Arc<dyn Fn(Routine) -> Routine + Send + Sync + 'static>;

/// How often the routine behind a binding runs
#[derive(Clone, Default)]
pub enum Lifestyle {
    /// Every resolve builds a new instance
    #[default]
    Transient,
    /// Built once, when the binding is compiled, then shared
    ///
    /// A singleton with a member of its own type also runs its constructor a
    /// second time, for the member's bare instance.
    Singleton,
    /// Caller supplied caching
    Custom(Wrapper),
}
impl std::fmt::Debug for Lifestyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifestyle::Transient => f.write_str("Transient"),
            Lifestyle::Singleton => f.write_str("Singleton"),
            Lifestyle::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl Lifestyle {
    /// Custom lifestyle
    ///
    /// `wrap` receives the producer of fresh instances and returns the producer
    /// callers will use, which may cache however it likes.
    pub fn custom<F>(wrap: F) -> Self
    where
        F: Fn(Routine) -> Routine + Send + Sync + 'static,
    {
        Lifestyle::Custom(Arc::new(wrap))
    }

    /// One instance per calling thread
    ///
    /// Instances live in the thread's own storage and are dropped when it
    /// exits. Entries of a recompiled binding are pruned on the thread's next
    /// miss.
    pub fn per_thread() -> Self {
        Lifestyle::custom(|produce| {
            let id = NEXT_CACHE.fetch_add(1, Ordering::Relaxed);
            let alive = Arc::new(());
            Arc::new(move || -> Result<Instance, ResolveError> {
                let cached = PER_THREAD
                    .try_with(|cache| cache.borrow().get(&id).map(|(_, instance)| instance.clone()))
                    .ok()
                    .flatten();
                if let Some(instance) = cached {
                    return Ok(instance);
                }
                // Not borrowed while producing, the routine may resolve other per-thread bindings
                let instance = produce()?;
                let stored = PER_THREAD.try_with(|cache| {
                    let mut cache = cache.borrow_mut();
                    cache.retain(|_, (owner, _)| owner.strong_count() > 0);
                    cache
                        .entry(id)
                        .or_insert_with(|| (Arc::downgrade(&alive), instance.clone()))
                        .1
                        .clone()
                });
                // Storage already torn down on an exiting thread, nothing to cache in
                Ok(stored.unwrap_or(instance))
            })
        })
    }

    pub(crate) fn wrap(&self, produce: Routine) -> Result<Routine, ResolveError> {
        match self {
            Lifestyle::Transient => Ok(produce),
            Lifestyle::Singleton => {
                // Built eagerly, so configuration errors surface at compile time
                let instance = produce()?;
                Ok(Arc::new(move || Ok::<_, ResolveError>(instance.clone())))
            }
            Lifestyle::Custom(wrap) => Ok(wrap(produce)),
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Lifestyle::Singleton)
    }
}
