//! Environment chain invariants: upward lookup, local caching on hit,
//! shadowing, root/depth bookkeeping (spec.md §4.3, invariants E1-E4).

use wisp::{Environment, Sexpr, SymbolProvider};

fn root() -> Environment {
    Environment::root(SymbolProvider::with_core_seed())
}

#[test]
fn root_has_no_parent_and_zero_depth() {
    let env = root();
    assert!(env.is_root());
    assert_eq!(env.depth(), 0);
}

#[test]
fn child_increments_depth_and_is_not_root() {
    let env = root().child();
    assert!(!env.is_root());
    assert_eq!(env.depth(), 1);
    assert_eq!(env.child().depth(), 2);
}

#[test]
fn a_binding_is_visible_through_an_arbitrary_number_of_child_scopes() {
    let top = root();
    let symbol = top.provider().intern("x", false);
    top.set(symbol.clone(), Sexpr::Int(42));

    let leaf = top.child().child().child();
    match leaf.try_get_symbol(&symbol) {
        Some(Sexpr::Int(42)) => {}
        other => panic!("expected Some(Int(42)), got {other:?}"),
    }
}

#[test]
fn an_unbound_symbol_returns_none_all_the_way_to_the_root() {
    let top = root();
    let leaf = top.child().child();
    let symbol = leaf.provider().intern("nowhere", false);
    assert!(leaf.try_get_symbol(&symbol).is_none());
    assert!(!leaf.contains_symbol(&symbol));
}

#[test]
fn set_shadows_a_parent_binding_without_mutating_it() {
    let top = root();
    let symbol = top.provider().intern("x", false);
    top.set(symbol.clone(), Sexpr::Int(1));

    let child = top.child();
    child.set(symbol.clone(), Sexpr::Int(2));

    match child.try_get_symbol(&symbol) {
        Some(Sexpr::Int(2)) => {}
        other => panic!("expected the shadowed value, got {other:?}"),
    }
    match top.try_get_symbol(&symbol) {
        Some(Sexpr::Int(1)) => {}
        other => panic!("parent binding must be untouched, got {other:?}"),
    }
}

#[test]
fn an_upward_hit_is_cached_locally_as_a_stale_snapshot() {
    // Invariant E4: a successful lookup through an ancestor copies the
    // value into the asking environment's local dictionary. Rebinding the
    // ancestor afterwards must not be visible through the cached copy —
    // this is a deliberate snapshot, not live shadowing (spec.md §9).
    let top = root();
    let symbol = top.provider().intern("x", false);
    top.set(symbol.clone(), Sexpr::Int(1));

    let child = top.child();
    assert!(matches!(child.try_get_symbol(&symbol), Some(Sexpr::Int(1))));

    top.set(symbol.clone(), Sexpr::Int(999));
    match child.try_get_symbol(&symbol) {
        Some(Sexpr::Int(1)) => {}
        other => panic!("expected the stale cached snapshot Int(1), got {other:?}"),
    }
}

#[test]
fn contains_literal_interns_a_never_before_seen_name() {
    let env = root();
    assert!(!env.provider().contains("brand-new"));
    assert!(!env.contains_literal("brand-new"));
    assert!(env.provider().contains("brand-new"));
}

#[test]
fn every_environment_in_a_chain_shares_one_provider() {
    let top = root();
    let child = top.child();
    let grandchild = child.child();
    assert_eq!(top.provider().let_().index(), child.provider().let_().index());
    assert_eq!(top.provider().let_(), grandchild.provider().let_());
}
