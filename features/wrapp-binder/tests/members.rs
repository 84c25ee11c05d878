mod support;

use std::sync::Arc;

use support::*;
use wrapp_binder::{BindingDescription, BindingError, Member, MemberSetter, Registry, ResolveError, TypeInfo};

fn french() -> Arc<dyn Greeter> {
    Arc::new(French { id: next_id() })
}

#[test]
fn transient_member_of_its_own_type_is_filled_once() {
    let registry = Registry::new();

    let node = registry.resolve::<Node>().unwrap();
    let next = node.next.as_ref().expect("member injected");
    assert_ne!(node.id, next.id);
    assert!(next.next.is_none());
}

#[test]
fn singleton_member_of_its_own_type_does_not_recurse() {
    let registry = Registry::new();

    let anchor = registry.resolve::<Anchor>().unwrap();
    let other = anchor.other.as_ref().expect("member injected");
    assert!(!Arc::ptr_eq(&anchor, other));
    assert!(other.other.is_none());

    assert!(Arc::ptr_eq(&anchor, &registry.resolve::<Anchor>().unwrap()));
}

#[test]
fn redeclared_member_shadows_the_base_one() {
    let registry = Registry::new();
    registry
        .register(BindingDescription::new::<String>().with_instance(Arc::new("injected".to_string())))
        .unwrap();
    registry.register(BindingDescription::new::<English>()).unwrap();

    let fancy = registry.resolve::<FancyWidget>().unwrap();
    assert_eq!(fancy.label.as_deref().map(String::as_str), Some("injected"));
    assert!(fancy.base.label.is_none());
    // Members the derived type does not redeclare are still inherited
    assert_eq!(fancy.base.greeter.as_ref().map(|greeter| greeter.greet()).as_deref(), Some("hello"));

    let base = registry.resolve::<BaseWidget>().unwrap();
    assert_eq!(base.label.as_deref().map(String::as_str), Some("injected"));
}

#[test]
fn rebinding_a_member_type_rebuilds_its_owner() {
    let registry = Registry::new();
    registry.register(BindingDescription::new::<English>()).unwrap();

    let before = registry.resolve::<BaseWidget>().unwrap();
    assert_eq!(before.greeter.as_ref().unwrap().greet(), "hello");
    assert!(registry.is_compiled::<BaseWidget>());

    registry
        .register(BindingDescription::new::<dyn Greeter>().to::<French>())
        .unwrap();
    assert!(!registry.is_compiled::<BaseWidget>());

    let after = registry.resolve::<BaseWidget>().unwrap();
    assert_eq!(after.greeter.as_ref().unwrap().greet(), "bonjour");
    assert!(registry.is_compiled::<BaseWidget>());
}

#[test]
fn members_are_injected_into_existing_instances() {
    let registry = Registry::new();
    registry.register(BindingDescription::new::<English>()).unwrap();

    let holder = registry.inject_members(Holder::default()).unwrap();
    assert_eq!(holder.greeter.unwrap().greet(), "hello");
}

#[test]
fn explicit_member_setter_is_used_for_existing_instances() {
    let registry = Registry::new();
    let greeter = Member::new("greeter", |holder: &mut Holder, greeter: Arc<dyn Greeter>| {
        holder.greeter = Some(greeter)
    });
    registry
        .register(BindingDescription::new::<Holder>().with_member(MemberSetter::explicit(greeter, french)))
        .unwrap();

    let holder = registry.inject_members(Holder::default()).unwrap();
    assert_eq!(holder.greeter.unwrap().greet(), "bonjour");
}

#[test]
fn explicit_member_overrides_the_declared_one() {
    let registry = Registry::new();
    let greeter = Member::new("greeter", |base: &mut BaseWidget, greeter: Arc<dyn Greeter>| {
        base.greeter = Some(greeter)
    });
    registry
        .register(BindingDescription::new::<BaseWidget>().with_member(MemberSetter::explicit(greeter, french)))
        .unwrap();

    let base = registry.resolve::<BaseWidget>().unwrap();
    assert_eq!(base.greeter.as_ref().unwrap().greet(), "bonjour");
    assert_eq!(base.label.as_deref().map(String::as_str), Some(""));
}

#[test]
fn unresolvable_member_fails_the_resolve() {
    let registry = Registry::new();

    match registry.resolve::<BaseWidget>() {
        Err(ResolveError::Binding(BindingError::UnresolvableInterface(info))) => {
            assert_eq!(info, TypeInfo::of::<dyn Greeter>())
        }
        _ => panic!("expected the greeter member to fail"),
    }
}

#[test]
fn value_typed_member_is_rejected_at_registration() {
    let registry = Registry::new();

    match registry.register(BindingDescription::new::<Counter>()) {
        Err(BindingError::InvalidMemberTarget { owner, member, target }) => {
            assert_eq!(owner, TypeInfo::of::<Counter>());
            assert_eq!(member, "count");
            assert_eq!(target, TypeInfo::of::<u32>());
        }
        other => panic!("expected an invalid member target, got {other:?}"),
    }
}

#[test]
fn members_can_be_left_out() {
    let registry = Registry::new();
    registry
        .register(BindingDescription::new::<Counter>().without_declared_members())
        .unwrap();

    assert!(registry.resolve::<Counter>().unwrap().count.is_none());
}
