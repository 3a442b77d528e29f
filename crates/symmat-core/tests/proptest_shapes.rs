//! Property tests for shape rules of graph construction.
//!
//! These use proptest to generate random shapes and check that every builder
//! either yields the expected output shape or rejects the operands.

use proptest::prelude::*;
use symmat_core::{Expr, Region, Shape, SymError};

// ── Strategies ───────────────────────────────────────────────────────────

/// A random dimension (1..=6 keeps the graphs small).
fn dim() -> impl Strategy<Value = usize> {
    1usize..=6
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    (dim(), dim()).prop_map(|(r, c)| Shape::new(r, c))
}

/// A shape plus a region that lies inside it.
fn shape_and_region() -> impl Strategy<Value = (Shape, Region)> {
    arb_shape().prop_flat_map(|s| {
        (0..s.rows, 0..s.cols).prop_flat_map(move |(r, c)| {
            (1..=s.rows - r, 1..=s.cols - c)
                .prop_map(move |(h, w)| (s, Region::new(r, c, h, w)))
        })
    })
}

proptest! {
    #[test]
    fn elementwise_requires_equal_shapes(a in arb_shape(), b in arb_shape()) {
        let x = Expr::zeros(a);
        let y = Expr::zeros(b);
        match x.add(&y) {
            Ok(z) => {
                prop_assert_eq!(a, b);
                prop_assert_eq!(z.shape(), a);
            }
            Err(SymError::ShapeMismatch { .. }) => prop_assert_ne!(a, b),
            Err(e) => prop_assert!(false, "unexpected error {e}"),
        }
    }

    #[test]
    fn matmul_shape_rule(a in arb_shape(), b in arb_shape()) {
        let x = Expr::zeros(a);
        let y = Expr::zeros(b);
        let result = x.mtimes(&y);
        if a.is_scalar() {
            prop_assert_eq!(result.unwrap().shape(), b);
        } else if b.is_scalar() {
            prop_assert_eq!(result.unwrap().shape(), a);
        } else if a.cols == b.rows {
            prop_assert_eq!(result.unwrap().shape(), Shape::new(a.rows, b.cols));
        } else {
            let is_mismatch = matches!(result, Err(SymError::ShapeMismatch { .. }));
            prop_assert!(is_mismatch);
        }
    }

    #[test]
    fn transpose_twice_is_identity(s in arb_shape()) {
        let x = Expr::symbol("x", s);
        let tt = x.transpose().transpose();
        prop_assert_eq!(tt.shape(), s);
        prop_assert!(tt.is_equal(&x));
    }

    #[test]
    fn slice_shape_matches_region((s, region) in shape_and_region()) {
        let x = Expr::symbol("x", s);
        let part = x.slice(region).unwrap();
        prop_assert_eq!(part.shape(), region.shape());
        let back = x.set_slice(region, &part).unwrap();
        prop_assert_eq!(back.shape(), s);
    }

    #[test]
    fn out_of_bounds_slice_is_invalid_access(s in arb_shape(), extra in 1usize..4) {
        let x = Expr::zeros(s);
        let region = Region::new(0, 0, s.rows + extra, s.cols);
        let is_invalid = matches!(x.slice(region), Err(SymError::InvalidAccess { .. }));
        prop_assert!(is_invalid);
    }
}
