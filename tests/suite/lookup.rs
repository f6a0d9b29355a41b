//! Value lookup tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use scopetree_core::{Scope, background, cause, todo, value_of, with_cancel, with_value};

use crate::common::{Opaque, with_deadline};

#[derive(Debug, PartialEq)]
struct Tenant;

#[test]
fn value_survives_cancellation() {
    let (p, cancel_p) = with_cancel(background());
    let (c, _cancel_c) = with_cancel(p.clone());
    let g = with_value(c, "a", 1_i32);

    cancel_p.cancel();

    let p_err = p.err().expect("parent canceled");
    assert!(cause(&*g).is_some_and(|c| c.ptr_eq(&p_err)));
    assert!(g.err().is_some_and(|e| e.ptr_eq(&p_err)));
    assert_eq!(value_of::<i32>(&*g, &"a").as_deref(), Some(&1));
}

#[test]
fn unregistered_key_resolves_to_none_through_every_layer() {
    let (c, _cancel) = with_cancel(todo());
    let v = with_value(c, Tenant, "acme");
    let (c2, _cancel2) = with_cancel(v);
    let v2 = with_value(c2, "depth", 2_u8);

    assert!(v2.value(&"nothing").is_none());
    assert!(v2.value(&42_i32).is_none());
    assert_eq!(value_of::<&str>(&*v2, &Tenant).as_deref(), Some(&"acme"));
}

#[test]
fn keys_of_different_types_do_not_collide() {
    let scope = with_value(with_value(background(), 1_u8, "u8"), 1_u16, "u16");
    assert_eq!(value_of::<&str>(&*scope, &1_u8).as_deref(), Some(&"u8"));
    assert_eq!(value_of::<&str>(&*scope, &1_u16).as_deref(), Some(&"u16"));
    assert!(scope.value(&1_u32).is_none());
}

#[test]
fn lookup_crosses_external_scopes() {
    let at = Instant::now() + Duration::from_secs(60);
    let base = with_value(background(), "region", "eu-west");
    let (c, _cancel) = with_cancel(with_deadline(base, at));
    let leaf = with_value(c, "attempt", 3_u32);

    assert_eq!(
        value_of::<&str>(&*leaf, &"region").as_deref(),
        Some(&"eu-west")
    );
    assert_eq!(leaf.deadline(), Some(at));
}

#[test]
fn external_scope_can_end_the_chain() {
    let scope = with_value(Arc::new(Opaque), "a", 1_i32);
    assert!(scope.value(&"b").is_none());
    assert!(cause(&*scope).is_none());
}
