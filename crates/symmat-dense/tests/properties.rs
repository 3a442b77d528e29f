//! Algebraic and structural properties of DynMatrix, checked numerically on
//! random data.

use proptest::prelude::*;
use symmat_dense::{DynMatrix, SymError};

const TOL: f64 = 1e-9;

fn dim() -> impl Strategy<Value = usize> {
    1usize..=5
}

fn values(n: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-10.0f64..10.0, n)
}

/// A constant matrix with random shape and entries.
fn arb_matrix() -> impl Strategy<Value = DynMatrix> {
    (dim(), dim()).prop_flat_map(|(r, c)| matrix_of(r, c))
}

fn matrix_of(rows: usize, cols: usize) -> impl Strategy<Value = DynMatrix> {
    values(rows * cols).prop_map(move |data| {
        DynMatrix::from_row_slice(rows, cols, &data).expect("length matches shape")
    })
}

/// Three matrices sharing one random shape.
fn same_shape_triple() -> impl Strategy<Value = (DynMatrix, DynMatrix, DynMatrix)> {
    (dim(), dim()).prop_flat_map(|(r, c)| (matrix_of(r, c), matrix_of(r, c), matrix_of(r, c)))
}

fn assert_close(a: &[f64], b: &[f64]) -> Result<(), TestCaseError> {
    prop_assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        prop_assert!((x - y).abs() <= TOL * (1.0 + x.abs().max(y.abs())), "{x} vs {y}");
    }
    Ok(())
}

proptest! {
    #[test]
    fn zero_has_requested_shape(r in dim(), c in dim()) {
        let z = DynMatrix::zero(r, c);
        prop_assert_eq!((z.rows(), z.cols(), z.size()), (r, c, r * c));
        prop_assert!(z.to_vec().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn identity_is_diagonal(n in dim()) {
        let id = DynMatrix::identity(n);
        let data = id.to_vec().unwrap();
        for i in 0..n {
            for j in 0..n {
                prop_assert_eq!(data[i * n + j], if i == j { 1.0 } else { 0.0 });
            }
        }
    }

    #[test]
    fn resize_keeps_overlap_and_zero_fills(m in arb_matrix(), r in dim(), c in dim()) {
        let before = m.to_vec().unwrap();
        let old_cols = m.cols();
        let old_rows = m.rows();

        let mut resized = m.clone();
        resized.resize(r, c).unwrap();
        prop_assert_eq!((resized.rows(), resized.cols()), (r, c));

        let after = resized.to_vec().unwrap();
        for i in 0..r {
            for j in 0..c {
                let expected = if i < old_rows && j < old_cols {
                    before[i * old_cols + j]
                } else {
                    0.0
                };
                prop_assert_eq!(after[i * c + j], expected);
            }
        }
    }

    #[test]
    fn double_transpose_is_structurally_equal(m in arb_matrix()) {
        prop_assert_eq!(m.transpose().transpose(), m);
    }

    #[test]
    fn addition_is_associative((a, b, c) in same_shape_triple()) {
        let left = (&(&a + &b).unwrap() + &c).unwrap();
        let right = (&a + &(&b + &c).unwrap()).unwrap();
        assert_close(&left.to_vec().unwrap(), &right.to_vec().unwrap())?;
    }

    #[test]
    fn identity_is_right_neutral(m in arb_matrix()) {
        let product = (&m * &DynMatrix::identity(m.cols())).unwrap();
        prop_assert_eq!(product.shape(), m.shape());
        assert_close(&product.to_vec().unwrap(), &m.to_vec().unwrap())?;
    }

    #[test]
    fn dot_is_sum_of_products(n in dim(), extra in 0usize..3) {
        let u_data: Vec<f64> = (0..n).map(|i| i as f64 - 1.5).collect();
        let v_data: Vec<f64> = (0..n).map(|i| 2.0 * i as f64 + 0.25).collect();
        let u = DynMatrix::from_row_slice(n, 1, &u_data).unwrap();
        let v = DynMatrix::from_row_slice(1, n, &v_data).unwrap();

        let expected: f64 = u_data.iter().zip(&v_data).map(|(a, b)| a * b).sum();
        let got = u.dot(&v).unwrap().to_f64().unwrap();
        prop_assert!((got - expected).abs() < TOL);

        if extra > 0 {
            let longer = DynMatrix::zero(n + extra, 1);
            let is_mismatch = matches!(u.dot(&longer), Err(SymError::ShapeMismatch { .. }));
            prop_assert!(is_mismatch);
        }
    }

    #[test]
    fn block_matches_elements(
        (m, r0, c0, h, w) in arb_matrix().prop_flat_map(|m| {
            let (rows, cols) = (m.rows(), m.cols());
            (0..rows, 0..cols).prop_flat_map(move |(r0, c0)| {
                let m = m.clone();
                (1..=rows - r0, 1..=cols - c0)
                    .prop_map(move |(h, w)| (m.clone(), r0, c0, h, w))
            })
        })
    ) {
        let block = m.block(r0, c0, h, w).unwrap();
        prop_assert_eq!((block.rows(), block.cols()), (h, w));

        let data = block.to_vec().unwrap();
        for i in 0..h {
            for j in 0..w {
                let elem = m.at(r0 + i, c0 + j).unwrap().to_f64().unwrap();
                prop_assert_eq!(data[i * w + j], elem);
            }
        }
    }

    #[test]
    fn element_write_touches_one_cell(m in arb_matrix(), value in -5.0f64..5.0, pick in any::<prop::sample::Index>()) {
        let (rows, cols) = (m.rows(), m.cols());
        let k = pick.index(rows * cols);
        let (i, j) = (k / cols, k % cols);

        let before = m.to_vec().unwrap();
        let mut written = m.clone();
        written.at_mut(i, j).unwrap().set_value(value).unwrap();
        let after = written.to_vec().unwrap();

        for idx in 0..rows * cols {
            let expected = if idx == k { value } else { before[idx] };
            prop_assert_eq!(after[idx], expected);
        }
        prop_assert_eq!(m.to_vec().unwrap(), before);
    }
}
