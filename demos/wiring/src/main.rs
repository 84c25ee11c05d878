use std::sync::Arc;

use tracing::info;
use wrapp_binder::{
    BindingDescription, Describe, Lifestyle, Member, MemberSetter, Recipe, Registry, TypeDescriptor,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app = Registry::builder()
        .register(BindingDescription::new::<String>().with_instance(Arc::new("wiring".to_string())))
        .register(BindingDescription::new::<dyn Store>().to::<MemoryStore>())
        .register(BindingDescription::new::<Service>().with_lifestyle(Lifestyle::per_thread()))
        .build_verified()
        .unwrap();

    let service = app.resolve::<Service>().unwrap();
    info!("{} stored {} entries", service.name, service.store.len());

    let audited = app.inject_members(Audited::default()).unwrap();
    println!("{:?}", app);
    println!("audit log attached: {}", audited.store.is_some());

    // Rebinding the store only recompiles what inlined it
    app.register(
        BindingDescription::new::<dyn Store>().with_factory(Recipe::shared(|| -> Arc<dyn Store> {
            Arc::new(MemoryStore { entries: 3 })
        })),
    )
    .unwrap();
    println!("compiled after rebinding: {}", app.is_compiled::<Service>());
    let service = app.resolve::<Service>().unwrap();
    println!("{} now sees {} entries", service.name, service.store.len());

    let label = MemberSetter::explicit(
        Member::new("label", |audited: &mut Audited, label: Arc<String>| audited.label = Some(label)),
        || Arc::new("manual".to_string()),
    );
    app.register(BindingDescription::new::<Audited>().with_member(label)).unwrap();
    let audited = app.resolve::<Audited>().unwrap();
    println!("{:?}", audited.label);
}

trait Store: Send + Sync {
    fn len(&self) -> usize;
}
impl Describe for dyn Store {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::interface::<dyn Store>().build()
    }
}

#[derive(Debug)]
struct MemoryStore {
    entries: usize,
}
impl Store for MemoryStore {
    fn len(&self) -> usize {
        self.entries
    }
}
impl Describe for MemoryStore {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<MemoryStore>()
            .construct_with(|| MemoryStore { entries: 1 })
            .implements::<dyn Store>(|store| store)
            .singleton()
            .build()
    }
}

struct Service {
    name: Arc<String>,
    store: Arc<dyn Store>,
}
impl Describe for Service {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Service>()
            .construct_with(|name: Arc<String>, store: Arc<dyn Store>| Service { name, store })
            .build()
    }
}

#[derive(Default)]
struct Audited {
    store: Option<Arc<dyn Store>>,
    label: Option<Arc<String>>,
}
impl Describe for Audited {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<Audited>()
            .construct_with(Audited::default)
            .member("store", |audited: &mut Audited, store: Arc<dyn Store>| audited.store = Some(store))
            .build()
    }
}
