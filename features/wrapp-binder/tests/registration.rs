mod support;

use std::sync::Arc;

use rstest::rstest;
use support::*;
use wrapp_binder::{
    BindingDescription, BindingError, Constructor, OpenGenericBinding, Recipe, Registry, RegistryOptions,
    ResolveError, TypeInfo,
};

#[test]
fn registry_cannot_be_bound() {
    let registry = Registry::new();

    assert!(matches!(
        registry.register(BindingDescription::new::<Registry>()),
        Err(BindingError::SelfBinding(_))
    ));
    assert!(matches!(
        registry.register_named("other", BindingDescription::new::<Registry>()),
        Err(BindingError::SelfBinding(_))
    ));
}

#[test]
fn implementation_must_implement_the_service() {
    let registry = Registry::new();

    match registry.register(BindingDescription::new::<dyn Greeter>().to::<A>()) {
        Err(BindingError::NotAssignable { service, implementation }) => {
            assert_eq!(service, TypeInfo::of::<dyn Greeter>());
            assert_eq!(implementation, TypeInfo::of::<A>());
        }
        other => panic!("expected not assignable, got {other:?}"),
    }
}

#[test]
fn constructor_and_factory_conflict() {
    let registry = Registry::new();
    let binding = BindingDescription::new::<A>()
        .with_constructor(Constructor::new(Recipe::new(|| A { id: 0 })))
        .with_factory(Recipe::new(|| A { id: 1 }));

    assert!(matches!(registry.register(binding), Err(BindingError::ConflictingRecipe(_))));
}

#[rstest]
#[case::off(false, true)]
#[case::on(true, false)]
fn freezing_after_first_resolve(#[case] freeze: bool, #[case] accepted: bool) {
    let registry = Registry::builder().freeze_after_first_resolve(freeze).build().unwrap();
    registry.register(BindingDescription::new::<A>()).unwrap();
    registry.resolve::<A>().unwrap();

    let result = registry.register(BindingDescription::new::<C>());
    assert_eq!(result.is_ok(), accepted);
    if !accepted {
        assert!(matches!(result, Err(BindingError::RegistrationFrozen(info)) if info == TypeInfo::of::<C>()));
    }
}

#[test]
fn frozen_registry_rejects_open_generics() {
    let registry = Registry::with_options(RegistryOptions::default().frozen_after_first_resolve());
    registry.resolve::<A>().unwrap();

    assert!(matches!(
        registry.register_open_generic(OpenGenericBinding::new::<BoxesDef, BoxedDef>()),
        Err(BindingError::RegistrationFrozen(_))
    ));
}

#[test]
fn verified_registry_is_frozen() {
    let registry = Registry::builder()
        .freeze_after_first_resolve(true)
        .register(BindingDescription::new::<A>())
        .build_verified()
        .unwrap();

    assert!(matches!(
        registry.register(BindingDescription::new::<E>()),
        Err(BindingError::RegistrationFrozen(_))
    ));
}

#[test]
fn build_stops_at_the_first_invalid_registration() {
    let result = Registry::builder()
        .register(BindingDescription::new::<A>())
        .register(BindingDescription::new::<Counter>())
        .build();

    assert!(matches!(result, Err(BindingError::InvalidMemberTarget { .. })));
}

#[test]
fn build_verified_surfaces_configuration_errors() {
    let result = Registry::builder()
        .register(BindingDescription::new::<Welcome>())
        .build_verified();

    match result {
        Err(ResolveError::Binding(BindingError::UnresolvableInterface(info))) => {
            assert_eq!(info, TypeInfo::of::<dyn Greeter>())
        }
        other => panic!("expected an unresolvable interface, got {:?}", other.err()),
    }
}

#[test]
fn verify_checks_member_targets() {
    let registry = Registry::new();
    registry.register(BindingDescription::new::<BaseWidget>()).unwrap();

    assert!(matches!(
        registry.verify(),
        Err(ResolveError::Binding(BindingError::UnresolvableInterface(_)))
    ));

    registry.register(BindingDescription::new::<English>()).unwrap();
    assert!(registry.verify().is_ok());
}

#[test]
fn later_registration_replaces_the_earlier_one() {
    let registry = Registry::new();
    registry
        .register(BindingDescription::new::<String>().with_instance(Arc::new("first".to_string())))
        .unwrap();
    assert_eq!(*registry.resolve::<String>().unwrap(), "first");

    registry
        .register(BindingDescription::new::<String>().with_instance(Arc::new("second".to_string())))
        .unwrap();
    assert_eq!(*registry.resolve::<String>().unwrap(), "second");
}

#[test]
fn describe_is_cached_per_registry() {
    let registry = Registry::new();

    let first = registry.describe::<FancyWidget>();
    let second = registry.describe::<FancyWidget>();
    assert!(Arc::ptr_eq(&first, &second));

    let names: Vec<_> = first.members().iter().map(|member| member.name()).collect();
    assert_eq!(names, vec!["greeter", "label"]);
}
