use hop_ir::StringInterner;

use crate::body::{ExprId, LocalId};

use super::*;

fn interner_and_types() -> (StringInterner, TypeRef, TypeRef) {
    let interner = StringInterner::new();
    let red = TypeRef::named(interner.intern("RedActor"));
    let blue = TypeRef::named(interner.intern("BlueActor"));
    (interner, red, blue)
}

#[test]
fn isolated_parameter_matches_actor_instance_param() {
    let iso = IsolationDomain::IsolatedParameter(1);
    let inst = IsolationDomain::ActorInstance(ActorValue::Param(1));
    assert!(iso.same_executor(&inst));
    assert!(inst.same_executor(&iso));
    assert!(!iso.same_executor(&IsolationDomain::ActorInstance(ActorValue::Param(0))));
}

#[test]
fn unspecified_is_never_statically_equal() {
    let u = IsolationDomain::Unspecified;
    assert!(!u.same_executor(&u));
    assert!(!u.same_executor(&IsolationDomain::Nonisolated));
    assert!(!IsolationDomain::ActorInstance(ActorValue::SelfValue).same_executor(&u));
}

#[test]
fn global_actors_compare_by_type() {
    let (_, red, blue) = interner_and_types();
    let a = IsolationDomain::GlobalActor(red.clone());
    assert!(a.same_executor(&IsolationDomain::GlobalActor(red)));
    assert!(!a.same_executor(&IsolationDomain::GlobalActor(blue)));
    assert!(!a.same_executor(&IsolationDomain::ActorInstance(ActorValue::SelfValue)));
}

#[test]
fn generic_global_actor_arguments_distinguish_domains() {
    let interner = StringInterner::new();
    let g = interner.intern("G");
    let int = TypeRef::named(interner.intern("Int"));
    let string = TypeRef::named(interner.intern("String"));
    let g_int = IsolationDomain::GlobalActor(TypeRef::generic(g, vec![int.clone()]));
    let g_str = IsolationDomain::GlobalActor(TypeRef::generic(g, vec![string]));
    assert!(!g_int.same_executor(&g_str));
    assert!(g_int.same_executor(&IsolationDomain::GlobalActor(TypeRef::generic(g, vec![int]))));
}

#[test]
fn locally_constructed_values_are_not_special() {
    let local = IsolationDomain::ActorInstance(ActorValue::Local(LocalId::new(0)));
    let other = IsolationDomain::ActorInstance(ActorValue::Local(LocalId::new(1)));
    let temp = IsolationDomain::ActorInstance(ActorValue::Temp(ExprId::new(3)));
    assert!(local.same_executor(&local.clone()));
    assert!(!local.same_executor(&other));
    assert!(!local.same_executor(&temp));
}

#[test]
fn static_domains() {
    let (_, red, _) = interner_and_types();
    assert!(IsolationDomain::GlobalActor(red).is_static());
    assert!(IsolationDomain::IsolatedParameter(0).is_static());
    assert!(IsolationDomain::ActorInstance(ActorValue::SelfValue).is_static());
    assert!(!IsolationDomain::Nonisolated.is_static());
    assert!(!IsolationDomain::Unspecified.is_static());
}

#[test]
fn substitute_replaces_generic_parameters() {
    let interner = StringInterner::new();
    let t = interner.intern("T");
    let actor = TypeRef::generic(interner.intern("MyGenericActor"), vec![TypeRef::named(t)]);
    let int = TypeRef::named(interner.intern("Int"));
    let concrete = actor.substitute(&[t], std::slice::from_ref(&int));
    assert_eq!(concrete.display(&interner).to_string(), "MyGenericActor<Int>");
    // Missing argument: left as written.
    assert_eq!(actor.substitute(&[t], &[]), actor);
}

#[test]
fn describe_names_the_domain() {
    let (interner, red, _) = interner_and_types();
    assert_eq!(
        IsolationDomain::GlobalActor(red).describe(&interner),
        "global actor RedActor"
    );
    assert_eq!(
        IsolationDomain::IsolatedParameter(2).describe(&interner),
        "isolated parameter 2"
    );
    assert_eq!(IsolationDomain::Unspecified.describe(&interner), "unspecified");
}

mod proptest_same_executor {
    use proptest::prelude::*;

    use crate::body::{ExprId, LocalId};
    use crate::domain::{ActorValue, IsolationDomain, TypeRef};

    fn actor_value() -> impl Strategy<Value = ActorValue> {
        prop_oneof![
            Just(ActorValue::SelfValue),
            (0u32..3).prop_map(ActorValue::Param),
            (0u32..3).prop_map(ActorValue::Capture),
            (0u32..3).prop_map(|i| ActorValue::Local(LocalId::new(i))),
            (0u32..3).prop_map(|i| ActorValue::Temp(ExprId::new(i))),
        ]
    }

    fn domain() -> impl Strategy<Value = IsolationDomain> {
        prop_oneof![
            Just(IsolationDomain::Nonisolated),
            Just(IsolationDomain::Unspecified),
            actor_value().prop_map(IsolationDomain::ActorInstance),
            (0u32..3).prop_map(IsolationDomain::IsolatedParameter),
            (1u32..4).prop_map(|n| IsolationDomain::GlobalActor(TypeRef::named(
                hop_ir::Name::from_raw(n)
            ))),
        ]
    }

    proptest! {
        #[test]
        fn symmetric(a in domain(), b in domain()) {
            prop_assert_eq!(a.same_executor(&b), b.same_executor(&a));
        }

        #[test]
        fn reflexive_except_unspecified(a in domain()) {
            prop_assert_eq!(a.same_executor(&a), a != IsolationDomain::Unspecified);
        }

        #[test]
        fn equal_domains_with_values_share_the_value(a in domain(), b in domain()) {
            if a.same_executor(&b) {
                prop_assert_eq!(a.actor_value(), b.actor_value());
            }
        }
    }
}
