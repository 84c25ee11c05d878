use std::{
    any::Any,
    cell::RefCell,
    sync::{Arc, Weak},
};

use tracing::trace;

use crate::{
    descriptor::member::{Member, MemberSetter, MemberSource, ValueSource},
    errors::ResolveError,
    registry::RegistryInner,
    types::TypeInfo,
};

thread_local! {
    /// Owners whose members are being injected on this thread
    static INJECTING: RefCell<Vec<TypeInfo>> = const { RefCell::new(Vec::new()) };
}

/// Marks `owner` as being injected until dropped
struct Injecting;

impl Injecting {
    /// `None` if `owner` is already being injected further up the stack
    fn enter(owner: TypeInfo) -> Option<Injecting> {
        INJECTING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&owner) {
                return None;
            }
            stack.push(owner);
            Some(Injecting)
        })
    }
}

impl Drop for Injecting {
    fn drop(&mut self) {
        INJECTING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Compiled member assignments of one binding
///
/// Members are resolved when injected, not inlined into the construction
/// routine, so a type may hold members of its own type. An instance built
/// while its type is already being injected on the same thread gets no
/// members, which is what ends self-referencing chains.
pub(crate) struct MemberPlan {
    owner: TypeInfo,
    steps: Vec<(Member, ValueSource)>,
}

impl MemberPlan {
    pub(crate) fn compile(owner: TypeInfo, setters: &[MemberSetter], registry: &Arc<RegistryInner>) -> Self {
        let steps = setters
            .iter()
            .map(|setter| {
                let source: ValueSource = match &setter.source {
                    MemberSource::Explicit(value) => value.clone(),
                    MemberSource::ByType => {
                        let registry: Weak<RegistryInner> = Arc::downgrade(registry);
                        let target = setter.member.target();
                        Arc::new(move || {
                            registry
                                .upgrade()
                                .ok_or(ResolveError::RegistryDropped)?
                                .resolve_member(target)
                        })
                    }
                };
                (setter.member.clone(), source)
            })
            .collect();

        MemberPlan { owner, steps }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn inject(&self, target: &mut dyn Any) -> Result<(), ResolveError> {
        if self.steps.is_empty() {
            return Ok(());
        }
        let Some(_injecting) = Injecting::enter(self.owner) else {
            trace!("Skipped members of nested '{}'", self.owner);
            return Ok(());
        };

        for (member, source) in &self.steps {
            let value = source()?;
            member.assign(target, value)?;
            trace!("Injected '{}.{}'", self.owner, member.name());
        }
        Ok(())
    }
}
