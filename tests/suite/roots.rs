//! Root scope tests

use std::sync::Arc;

use scopetree_core::{EmptyScope, Scope, Shape, background, todo};

#[test]
fn background_is_a_stable_singleton() {
    let first = background();
    let second = background();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn todo_is_a_stable_singleton_distinct_from_background() {
    assert!(Arc::ptr_eq(&todo(), &todo()));
    assert!(!Arc::ptr_eq(&todo(), &background()));
}

#[test]
fn roots_report_nothing() {
    for root in [background(), todo()] {
        assert!(root.deadline().is_none());
        assert!(root.done().is_none());
        assert!(root.err().is_none());
        assert!(root.value(&"missing").is_none());
        assert!(matches!(root.shape(), Shape::Empty));
    }
}

#[test]
fn roots_are_named() {
    assert_eq!(background().to_string(), "scope.Background");
    assert_eq!(todo().to_string(), "scope.TODO");
    assert_eq!(EmptyScope::Todo.as_str(), "scope.TODO");
}
