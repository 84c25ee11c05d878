use std::collections::{HashMap, HashSet};

use crate::key::BindingKey;

/// Keys whose plans were inlined into a compiled plan, transitively
pub type DependencySet = HashSet<BindingKey>;

/// Who inlined whom
///
/// Only used to find the plans to clear when a binding changes, it never
/// keeps a resolver alive.
#[derive(Default)]
pub(crate) struct DependencyGraph {
    /// key -> keys whose compiled plans inlined it
    dependents: HashMap<BindingKey, HashSet<BindingKey>>,
    /// key -> keys its compiled plan inlined
    dependencies: HashMap<BindingKey, DependencySet>,
}

impl DependencyGraph {
    /// Records the dependency set of a freshly compiled plan
    pub(crate) fn record(&mut self, dependent: BindingKey, dependencies: &DependencySet) {
        self.forget(dependent);
        for dependency in dependencies {
            self.dependents.entry(*dependency).or_default().insert(dependent);
        }
        self.dependencies.insert(dependent, dependencies.clone());
    }

    /// Drops the edges recorded for `dependent`
    pub(crate) fn forget(&mut self, dependent: BindingKey) {
        let Some(dependencies) = self.dependencies.remove(&dependent) else {
            return;
        };
        for dependency in dependencies {
            if let Some(dependents) = self.dependents.get_mut(&dependency) {
                dependents.remove(&dependent);
                if dependents.is_empty() {
                    self.dependents.remove(&dependency);
                }
            }
        }
    }

    /// Every key that has to be recompiled when `changed` changes
    ///
    /// Dependency sets are transitive already, the walk only catches plans
    /// recorded before their own dependencies got recompiled. The returned
    /// keys are forgotten.
    pub(crate) fn take_dependents(&mut self, changed: BindingKey) -> Vec<BindingKey> {
        let mut seen = HashSet::from([changed]);
        let mut pending = vec![changed];
        let mut affected = Vec::new();

        while let Some(key) = pending.pop() {
            let Some(dependents) = self.dependents.get(&key) else {
                continue;
            };
            for dependent in dependents.clone() {
                if seen.insert(dependent) {
                    pending.push(dependent);
                    affected.push(dependent);
                }
            }
        }

        for dependent in &affected {
            self.forget(*dependent);
        }
        affected
    }

    pub(crate) fn dependencies_of(&self, dependent: BindingKey) -> Option<&DependencySet> {
        self.dependencies.get(&dependent)
    }
}
