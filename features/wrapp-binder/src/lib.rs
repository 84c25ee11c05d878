//! Wrapp Binder builds object graphs from declarative bindings.
//!
//! Every type the binder works with describes itself once through [Describe]:
//! its constructors, injectable members, the interfaces it implements and
//! the markers it carries. A [Registry] turns bindings into compiled
//! construction routines, inlining the routines of their dependencies, and
//! caches them until a binding they depend on changes.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use wrapp_binder::{BindingDescription, Describe, Registry, TypeDescriptor};
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//! impl Describe for dyn Clock {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::interface::<dyn Clock>().build()
//!     }
//! }
//!
//! struct Fixed;
//! impl Clock for Fixed {
//!     fn now(&self) -> u64 {
//!         42
//!     }
//! }
//! impl Describe for Fixed {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::concrete::<Fixed>()
//!             .construct_with(|| Fixed)
//!             .implements::<dyn Clock>(|fixed| fixed)
//!             .singleton()
//!             .build()
//!     }
//! }
//!
//! struct Scheduler {
//!     clock: Arc<dyn Clock>,
//! }
//! impl Describe for Scheduler {
//!     fn describe() -> TypeDescriptor {
//!         TypeDescriptor::concrete::<Scheduler>()
//!             .construct_with(|clock: Arc<dyn Clock>| Scheduler { clock })
//!             .build()
//!     }
//! }
//!
//! let registry = Registry::new();
//! registry
//!     .register(BindingDescription::new::<dyn Clock>().to::<Fixed>())
//!     .unwrap();
//! registry.verify().unwrap();
//!
//! let scheduler = registry.resolve::<Scheduler>().unwrap();
//! assert_eq!(scheduler.clock.now(), 42);
//! ```
//!
//! Wrapp Binder consists of the following components:
//!
//! 1. Descriptors - what the binder knows about a type
//! 2. Bindings - how a key gets produced, with its lifestyle and members
//! 3. Registry - registration, lookup, compilation and resolution
//! 4. Errors - configuration and resolution errors

pub mod binding;
pub mod builder;
pub(crate) mod catalog;
pub(crate) mod compiler;
pub mod config;
pub mod dependency_graph;
pub mod descriptor;
pub mod errors;
pub mod generics;
pub(crate) mod implicit;
pub mod key;
pub mod lifestyle;
pub mod registry;
pub(crate) mod resolver;
pub mod types;

pub use binding::BindingDescription;
pub use builder::RegistryBuilder;
pub use config::RegistryOptions;
pub use dependency_graph::DependencySet;
pub use descriptor::{
    generic::{GenericDef, GenericDefinition, GenericInstance},
    member::{Member, MemberSetter},
    recipe::{Constructor, Preference, Recipe, RecipeFn},
    Ancestor, Describe, Descriptor, TypeDescriptor, TypeKind, TypeRef,
};
pub use errors::{BindingError, GenericMismatchReason, ResolveError};
pub use generics::OpenGenericBinding;
pub use key::BindingKey;
pub use lifestyle::{Lifestyle, Routine};
pub use registry::Registry;
pub use types::{DynError, Injectable, Instance, TypeInfo};
