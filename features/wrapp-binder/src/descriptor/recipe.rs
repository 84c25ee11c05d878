use std::{any::type_name, sync::Arc};

use crate::{
    descriptor::{Describe, TypeRef, Upcast},
    errors::ResolveError,
    types::{DynError, Injectable, Instance, Product, TypeInfo},
};

pub(crate) type RecipeCall =
    Arc<dyn Fn(Vec<Instance>) -> Result<Product, ResolveError> + Send + Sync + 'static>;

/// A constructor or factory routine with its declared parameters
///
/// Parameters are resolved by type, in order, and handed to the routine as
/// `Arc`s. Typed recipes are built from closures taking up to eight `Arc` parameters:
///
/// ```rust
/// use std::sync::Arc;
/// use wrapp_binder::Recipe;
///
/// struct Config;
/// struct Client { config: Arc<Config> }
/// # impl wrapp_binder::Describe for Config {
/// #     fn describe() -> wrapp_binder::TypeDescriptor {
/// #         wrapp_binder::TypeDescriptor::concrete::<Config>().construct_with(|| Config).build()
/// #     }
/// # }
/// # impl wrapp_binder::Describe for Client {
/// #     fn describe() -> wrapp_binder::TypeDescriptor {
/// #         wrapp_binder::TypeDescriptor::concrete::<Client>().build()
/// #     }
/// # }
///
/// let recipe = Recipe::new(|config: Arc<Config>| Client { config });
/// assert_eq!(recipe.params().len(), 1);
/// ```
#[derive(Clone)]
pub struct Recipe {
    params: Vec<TypeRef>,
    output: TypeRef,
    shared: bool,
    call: RecipeCall,
}
impl std::fmt::Debug for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recipe")
            .field("output", &self.output)
            .field("params", &self.params)
            .field("shared", &self.shared)
            .finish()
    }
}

impl Recipe {
    /// Recipe building the value by value, members can be injected afterwards
    pub fn new<T, Args, F>(f: F) -> Self
    where
        T: Describe,
        F: RecipeFn<Args, T>,
    {
        Recipe {
            params: F::params(),
            output: TypeRef::of::<T>(),
            shared: false,
            call: Arc::new(move |args: Vec<Instance>| f.invoke(args).map(Product::owned)),
        }
    }

    /// Like [Recipe::new], but the routine may fail
    pub fn try_new<T, E, Args, F>(f: F) -> Self
    where
        T: Describe,
        E: Into<DynError>,
        F: RecipeFn<Args, Result<T, E>>,
    {
        let output = TypeRef::of::<T>();
        Recipe {
            params: F::params(),
            output,
            shared: false,
            call: Arc::new(move |args: Vec<Instance>| match f.invoke(args)? {
                Ok(value) => Ok(Product::owned(value)),
                Err(error) => Err(ResolveError::factory_failed(output.info(), error.into())),
            }),
        }
    }

    /// Recipe returning an already shared value, e.g. `Arc<dyn Trait>`
    pub fn shared<T, Args, F>(f: F) -> Self
    where
        T: ?Sized + Describe,
        F: RecipeFn<Args, Arc<T>>,
    {
        Recipe {
            params: F::params(),
            output: TypeRef::of::<T>(),
            shared: true,
            call: Arc::new(move |args: Vec<Instance>| f.invoke(args).map(|value| Product::Shared(Instance::new(value)))),
        }
    }

    /// Recipe always handing out the given value
    pub fn instance<T: ?Sized + Describe>(value: Arc<T>) -> Self {
        let instance = Instance::new(value);
        Recipe {
            params: Vec::new(),
            output: TypeRef::of::<T>(),
            shared: true,
            call: Arc::new(move |_: Vec<Instance>| Ok::<_, ResolveError>(Product::Shared(instance.clone()))),
        }
    }

    /// Resolves `target` and converts it into `output`
    pub(crate) fn forward(target: TypeRef, output: TypeRef, upcast: Upcast) -> Self {
        Recipe {
            params: vec![target],
            output,
            shared: true,
            call: Arc::new(move |args: Vec<Instance>| {
                let Some(resolved) = args.into_iter().next() else {
                    return Err(missing_argument(target.info().type_name));
                };
                upcast(resolved).map(Product::Shared)
            }),
        }
    }

    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    /// Shared recipe with a hand written call
    pub(crate) fn from_call(output: TypeRef, call: RecipeCall) -> Self {
        Recipe {
            params: Vec::new(),
            output,
            shared: true,
            call,
        }
    }

    /// Type produced by the routine
    pub fn output(&self) -> TypeInfo {
        self.output.info()
    }

    pub(crate) fn product(&self) -> TypeRef {
        self.output
    }

    /// If the routine hands out shared values instead of owned ones
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub(crate) fn call(&self) -> RecipeCall {
        self.call.clone()
    }
}

/// Constructor flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preference {
    #[default]
    Default,
    /// Prefer this constructor
    Inject,
    /// Never pick this constructor
    Ignore,
}

/// A way to construct a concrete type
#[derive(Debug, Clone)]
pub struct Constructor {
    pub(crate) recipe: Recipe,
    pub(crate) preference: Preference,
}

impl Constructor {
    pub fn new(recipe: Recipe) -> Self {
        Constructor {
            recipe,
            preference: Preference::Default,
        }
    }

    pub fn inject(mut self) -> Self {
        self.preference = Preference::Inject;
        self
    }

    pub fn ignore(mut self) -> Self {
        self.preference = Preference::Ignore;
        self
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn preference(&self) -> Preference {
        self.preference
    }

    /// Picks the constructor to use
    ///
    /// Ignored constructors never qualify. Among the rest, `Inject` ones win,
    /// then the one with the fewest parameters, then declaration order.
    pub fn select(constructors: &[Constructor]) -> Option<&Constructor> {
        let eligible = || {
            constructors
                .iter()
                .filter(|constructor| constructor.preference != Preference::Ignore)
        };
        let any_injected = eligible().any(|constructor| constructor.preference == Preference::Inject);

        eligible()
            .filter(|constructor| !any_injected || constructor.preference == Preference::Inject)
            .min_by_key(|constructor| constructor.recipe.params.len())
    }
}

/// Closures usable as recipes
///
/// Implemented for `Fn(Arc<A1>, .., Arc<An>) -> Out` up to eight parameters,
/// where every parameter type can be described.
pub trait RecipeFn<Args, Out>: Send + Sync + 'static {
    fn params() -> Vec<TypeRef>;

    fn invoke(&self, args: Vec<Instance>) -> Result<Out, ResolveError>;
}

fn missing_argument(required_type: &'static str) -> ResolveError {
    ResolveError::DowncastFailed {
        required_type,
        actual_type: "<missing argument>",
    }
}

fn next_arg<A: ?Sized + Injectable>(
    args: &mut std::vec::IntoIter<Instance>,
) -> Result<Arc<A>, ResolveError> {
    let instance = args.next().ok_or_else(|| missing_argument(type_name::<A>()))?;
    instance
        .downcast::<A>()
        .map_err(|actual_type| ResolveError::DowncastFailed {
            required_type: type_name::<A>(),
            actual_type,
        })
}

macro_rules! impl_recipe_fn {
    ($($arg:ident $var:ident),*) => {
        impl<Func, Out, $($arg,)*> RecipeFn<($(Arc<$arg>,)*), Out> for Func
        where
            Func: Fn($(Arc<$arg>),*) -> Out + Send + Sync + 'static,
            $($arg: ?Sized + Describe,)*
        {
            fn params() -> Vec<TypeRef> {
                vec![$(TypeRef::of::<$arg>()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn invoke(&self, args: Vec<Instance>) -> Result<Out, ResolveError> {
                let mut args = args.into_iter();
                $(let $var = next_arg::<$arg>(&mut args)?;)*
                Ok((self)($($var),*))
            }
        }
    };
}

impl_recipe_fn!();
impl_recipe_fn!(A1 a1);
impl_recipe_fn!(A1 a1, A2 a2);
impl_recipe_fn!(A1 a1, A2 a2, A3 a3);
impl_recipe_fn!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_recipe_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_recipe_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_recipe_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_recipe_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);
