#![allow(dead_code)]

use std::{
    any::type_name,
    marker::PhantomData,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use wrapp_binder::{
    Constructor, Describe, GenericDef, GenericDefinition, Recipe, TypeDescriptor, TypeInfo,
};

static IDS: AtomicUsize = AtomicUsize::new(0);

/// Unique id, to tell instances apart
pub fn next_id() -> usize {
    IDS.fetch_add(1, Ordering::SeqCst)
}

// Interfaces and implementations

pub trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}
impl Describe for dyn Greeter {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::interface::<dyn Greeter>().build()
    }
}

pub struct English {
    pub id: usize,
}
impl Greeter for English {
    fn greet(&self) -> String {
        "hello".into()
    }
}
impl Describe for English {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<English>()
            .construct_with(|| English { id: next_id() })
            .implements::<dyn Greeter>(|english| english)
            .build()
    }
}

pub struct French {
    pub id: usize,
}
impl Greeter for French {
    fn greet(&self) -> String {
        "bonjour".into()
    }
}
impl Describe for French {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<French>()
            .construct_with(|| French { id: next_id() })
            .implements::<dyn Greeter>(|french| french)
            .build()
    }
}

/// Uses whatever greeter is bound
pub struct Welcome {
    pub greeter: Arc<dyn Greeter>,
}
impl Describe for Welcome {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Welcome>()
            .construct_with(|greeter: Arc<dyn Greeter>| Welcome { greeter })
            .build()
    }
}

/// Asks for the greeter before French
pub struct GreeterFirst {
    pub greeter: Arc<dyn Greeter>,
    pub french: Arc<French>,
}
impl Describe for GreeterFirst {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<GreeterFirst>()
            .construct_with(|greeter: Arc<dyn Greeter>, french: Arc<French>| GreeterFirst { greeter, french })
            .build()
    }
}

/// Same parameters as [GreeterFirst], French first
pub struct FrenchFirst {
    pub french: Arc<French>,
    pub greeter: Arc<dyn Greeter>,
}
impl Describe for FrenchFirst {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<FrenchFirst>()
            .construct_with(|french: Arc<French>, greeter: Arc<dyn Greeter>| FrenchFirst { french, greeter })
            .build()
    }
}

pub trait Logger: Send + Sync {
    fn target(&self) -> &'static str;
}
impl Describe for dyn Logger {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::interface::<dyn Logger>()
            .implemented_by::<ConsoleLogger>(|console| console)
            .build()
    }
}

pub struct ConsoleLogger;
impl Logger for ConsoleLogger {
    fn target(&self) -> &'static str {
        "console"
    }
}
impl Describe for ConsoleLogger {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<ConsoleLogger>()
            .construct_with(|| ConsoleLogger)
            .implements::<dyn Logger>(|console| console)
            .build()
    }
}

// D -> C -> A and an unrelated E

pub struct A {
    pub id: usize,
}
impl Describe for A {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<A>()
            .construct_with(|| A { id: next_id() })
            .build()
    }
}

pub struct C {
    pub a: Arc<A>,
}
impl Describe for C {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<C>()
            .construct_with(|a: Arc<A>| C { a })
            .build()
    }
}

pub struct D {
    pub c: Arc<C>,
}
impl Describe for D {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<D>()
            .construct_with(|c: Arc<C>| D { c })
            .singleton()
            .build()
    }
}

pub struct E {
    pub id: usize,
}
impl Describe for E {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<E>()
            .construct_with(|| E { id: next_id() })
            .singleton()
            .build()
    }
}

// Cycles

pub struct Ouroboros {
    pub tail: Arc<Ouroboros>,
}
impl Describe for Ouroboros {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Ouroboros>()
            .construct_with(|tail: Arc<Ouroboros>| Ouroboros { tail })
            .build()
    }
}

pub struct Ping {
    pub pong: Arc<Pong>,
}
impl Describe for Ping {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Ping>()
            .construct_with(|pong: Arc<Pong>| Ping { pong })
            .build()
    }
}

pub struct Pong {
    pub ping: Arc<Ping>,
}
impl Describe for Pong {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Pong>()
            .construct_with(|ping: Arc<Ping>| Pong { ping })
            .build()
    }
}

// Constructor selection

pub struct Chosen {
    pub via: &'static str,
}
impl Describe for Chosen {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Chosen>()
            .constructor(Constructor::new(Recipe::new(|| Chosen { via: "fewest" })))
            .constructor(Constructor::new(Recipe::new(|_: Arc<String>| Chosen { via: "inject" })).inject())
            .build()
    }
}

pub struct Hidden;
impl Describe for Hidden {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Hidden>()
            .constructor(Constructor::new(Recipe::new(|| Hidden)).ignore())
            .build()
    }
}

// Members

/// Holds a member of its own type
#[derive(Default)]
pub struct Node {
    pub id: usize,
    pub next: Option<Arc<Node>>,
}
impl Describe for Node {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Node>()
            .construct_with(|| Node {
                id: next_id(),
                next: None,
            })
            .member("next", |node: &mut Node, next: Arc<Node>| node.next = Some(next))
            .build()
    }
}

/// Singleton holding a member of its own type
pub struct Anchor {
    pub id: usize,
    pub other: Option<Arc<Anchor>>,
}
impl Describe for Anchor {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Anchor>()
            .construct_with(|| Anchor {
                id: next_id(),
                other: None,
            })
            .member("other", |anchor: &mut Anchor, other: Arc<Anchor>| anchor.other = Some(other))
            .singleton()
            .build()
    }
}

#[derive(Default)]
pub struct BaseWidget {
    pub label: Option<Arc<String>>,
    pub greeter: Option<Arc<dyn Greeter>>,
}
impl Describe for BaseWidget {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<BaseWidget>()
            .construct_with(BaseWidget::default)
            .member("label", |base: &mut BaseWidget, label: Arc<String>| base.label = Some(label))
            .member("greeter", |base: &mut BaseWidget, greeter: Arc<dyn Greeter>| {
                base.greeter = Some(greeter)
            })
            .build()
    }
}

/// Embeds a [BaseWidget] and shadows its `label`
#[derive(Default)]
pub struct FancyWidget {
    pub base: BaseWidget,
    pub label: Option<Arc<String>>,
}
impl Describe for FancyWidget {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<FancyWidget>()
            .construct_with(FancyWidget::default)
            .inherits(|fancy: &mut FancyWidget| &mut fancy.base)
            .member("label", |fancy: &mut FancyWidget, label: Arc<String>| fancy.label = Some(label))
            .build()
    }
}

/// Built outside the registry, members injected afterwards
#[derive(Default)]
pub struct Holder {
    pub greeter: Option<Arc<dyn Greeter>>,
}
impl Describe for Holder {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Holder>()
            .member("greeter", |holder: &mut Holder, greeter: Arc<dyn Greeter>| {
                holder.greeter = Some(greeter)
            })
            .build()
    }
}

/// Declares a member of a value type
#[derive(Default)]
pub struct Counter {
    pub count: Option<Arc<u32>>,
}
impl Describe for Counter {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Counter>()
            .construct_with(Counter::default)
            .member("count", |counter: &mut Counter, count: Arc<u32>| counter.count = Some(count))
            .build()
    }
}

// Open generics

pub trait Boxes<T>: Send + Sync {
    fn id(&self) -> usize;
    fn content(&self) -> &'static str;
}
pub struct BoxesDef;
impl GenericDefinition for BoxesDef {
    const NAME: &'static str = "Boxes";
    const ARITY: usize = 1;
}
impl<T: Describe> Describe for dyn Boxes<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::interface::<dyn Boxes<T>>()
            .generic(GenericDef::of::<BoxesDef>(), vec![TypeInfo::of::<T>()])
            .build()
    }
}

pub struct Boxed<T> {
    pub id: usize,
    _content: PhantomData<T>,
}
pub struct BoxedDef;
impl GenericDefinition for BoxedDef {
    const NAME: &'static str = "Boxed";
    const ARITY: usize = 1;
}
impl<T: Describe> Boxes<T> for Boxed<T> {
    fn id(&self) -> usize {
        self.id
    }

    fn content(&self) -> &'static str {
        type_name::<T>()
    }
}
impl<T: Describe> Describe for Boxed<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Boxed<T>>()
            .construct_with(|| Boxed {
                id: next_id(),
                _content: PhantomData,
            })
            .implements::<dyn Boxes<T>>(|boxed| boxed)
            .generic(GenericDef::of::<BoxedDef>(), vec![TypeInfo::of::<T>()])
            .build()
    }
}

/// Generic, but not a `Boxes`
pub struct Loose<T>(PhantomData<T>);
pub struct LooseDef;
impl GenericDefinition for LooseDef {
    const NAME: &'static str = "Loose";
    const ARITY: usize = 1;
}
impl<T: Describe> Describe for Loose<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Loose<T>>()
            .construct_with(|| Loose(PhantomData))
            .generic(GenericDef::of::<LooseDef>(), vec![TypeInfo::of::<T>()])
            .build()
    }
}

pub struct PairDef;
impl GenericDefinition for PairDef {
    const NAME: &'static str = "Pair";
    const ARITY: usize = 2;
}
