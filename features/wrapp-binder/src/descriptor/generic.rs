use std::any::TypeId;

use crate::types::TypeInfo;

/// Marker for an unbound generic type, e.g. `Repository<_>`
///
/// ```rust
/// use wrapp_binder::GenericDefinition;
///
/// struct RepositoryDef;
/// impl GenericDefinition for RepositoryDef {
///     const NAME: &'static str = "Repository";
///     const ARITY: usize = 1;
/// }
/// ```
pub trait GenericDefinition: 'static {
    const NAME: &'static str;
    const ARITY: usize;
}

/// Identity of a generic definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericDef {
    pub id: TypeId,
    pub name: &'static str,
    pub arity: usize,
}

impl GenericDef {
    pub fn of<D: GenericDefinition>() -> Self {
        GenericDef {
            id: TypeId::of::<D>(),
            name: D::NAME,
            arity: D::ARITY,
        }
    }
}

impl std::fmt::Display for GenericDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}`{}", self.name, self.arity)
    }
}

/// A closed generic type: its definition and type arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericInstance {
    pub definition: GenericDef,
    pub args: Vec<TypeInfo>,
}

impl GenericInstance {
    pub fn arg_names(&self) -> Vec<&'static str> {
        self.args.iter().map(|arg| arg.type_name).collect()
    }
}
