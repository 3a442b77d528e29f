//! Hash-consing (CSE) and structural-equality integration tests.

use std::sync::Arc;

use smallvec::SmallVec;
use symmat_core::cpu_kernels::CpuRefBackend;
use symmat_core::graph::{NodeMeta, OpKind};
use symmat_core::{Bindings, Expr, GraphConfig, NodeRef, Shape, Stream};

fn meta(rows: usize, cols: usize) -> NodeMeta {
    NodeMeta {
        shape: Shape::new(rows, cols),
    }
}

fn pair(a: &NodeRef, b: &NodeRef) -> SmallVec<[NodeRef; 2]> {
    SmallVec::from_buf([Arc::clone(a), Arc::clone(b)])
}

/// Create a fresh stream so tests don't interfere via the global default.
fn fresh_stream() -> Arc<Stream> {
    Arc::new(Stream::with_config(
        Box::new(CpuRefBackend),
        GraphConfig::default(),
    ))
}

#[test]
fn cse_dedups_identical_ops() {
    let s = fresh_stream();
    let a = s.add_constant(vec![1.0, 2.0], meta(2, 1));
    let b = s.add_symbol("b", meta(2, 1));

    let c1 = s.add_op(OpKind::Add, pair(&a, &b), meta(2, 1));
    let c2 = s.add_op(OpKind::Add, pair(&a, &b), meta(2, 1));

    assert!(Arc::ptr_eq(&c1, &c2), "identical add ops should share a node");
}

#[test]
fn cse_dedups_identical_constants() {
    let s = fresh_stream();
    let a = s.add_constant(vec![1.0, 2.0, 3.0], meta(3, 1));
    let b = s.add_constant(vec![1.0, 2.0, 3.0], meta(3, 1));

    assert_eq!(a.id, b.id, "identical constants should return the same NodeId");
}

#[test]
fn cse_different_ops_not_deduped() {
    let s = fresh_stream();
    let a = s.add_symbol("a", meta(2, 2));
    let b = s.add_symbol("b", meta(2, 2));

    let add = s.add_op(OpKind::Add, pair(&a, &b), meta(2, 2));
    let mul = s.add_op(OpKind::MatMul, pair(&a, &b), meta(2, 2));

    assert_ne!(add.id, mul.id, "different ops should produce different NodeIds");
}

#[test]
fn cse_live_node_count() {
    let s = fresh_stream();
    let x = Expr::symbol_in(&s, "x", Shape::new(3, 3));
    assert_eq!(s.live_node_count(), 1);

    let t1 = x.transpose();
    assert_eq!(s.live_node_count(), 2, "first transpose creates one node");

    let t2 = x.transpose();
    assert_eq!(s.live_node_count(), 2, "duplicate transpose is shared");

    drop((t1, t2));
    assert_eq!(s.live_node_count(), 1, "transpose released with its handles");
}

#[test]
fn sharing_only_covers_live_nodes() {
    let s = fresh_stream();
    let x = Expr::symbol_in(&s, "x", Shape::new(2, 2));
    let first = x.abs().node_id();
    let again = x.abs();
    assert_ne!(again.node_id(), first, "released node is rebuilt, not revived");
    assert!(again.is_equal(&x.abs()));
}

#[test]
fn equal_expressions_built_twice_are_structurally_equal() {
    let s = fresh_stream();
    let q = Expr::symbol_in(&s, "q", Shape::new(3, 1));
    let m = Expr::identity_in(&s, 3);

    let lhs = (&(&m * &q).unwrap() + &q).unwrap();
    let rhs = (&(&m * &q).unwrap() + &q).unwrap();
    assert!(lhs.is_equal(&rhs));
    assert_eq!(lhs.node_id(), rhs.node_id());
}

#[test]
fn numerically_equal_is_not_structurally_equal() {
    let s = fresh_stream();
    let x = Expr::symbol_in(&s, "x", Shape::new(2, 1));
    let doubled = (&x + &x).unwrap();
    let scaled = x.scale(&Expr::from_data_in(&s, &[2.0], Shape::scalar()).unwrap()).unwrap();

    let b = Bindings::new().with(&x, &[1.0, 3.0]).unwrap();
    assert_eq!(doubled.eval(&b).unwrap(), scaled.eval(&b).unwrap());
    assert!(!doubled.is_equal(&scaled));
}

#[test]
fn equality_without_cse_relies_on_depth() {
    let config = GraphConfig {
        cse: false,
        eq_depth: 1,
    };
    let s = Arc::new(Stream::with_config(Box::new(CpuRefBackend), config));
    let x = Expr::symbol_in(&s, "x", Shape::new(2, 2));

    let a = x.abs().transpose();
    let b = x.abs().transpose();
    assert_ne!(a.node_id(), b.node_id());
    // T(fabs(x)) needs two levels: T, then fabs.
    assert!(!a.is_equal(&b));
    assert!(s.is_equal_depth(a.node(), b.node(), 2));
}

#[test]
fn mixing_streams_is_rejected() {
    let a = Expr::zeros_in(&fresh_stream(), Shape::new(2, 2));
    let b = Expr::zeros_in(&fresh_stream(), Shape::new(2, 2));
    assert!(a.add(&b).is_err());
    assert!(!a.is_equal(&b));
}
