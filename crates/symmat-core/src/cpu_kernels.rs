//! Built-in CPU reference backend — the numeric oracle for expressions.
//!
//! Simple, safe Rust implementations of every op on row-major `f64` data.
//! Correctness and readability over performance.

use crate::backend::{Backend, NodeInput};
use crate::graph::{NodeMeta, OpKind};
use crate::types::{Region, Shape};
use crate::{Result, SymError};

/// Relative pivot threshold below which a matrix is reported singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Reference CPU backend.
pub struct CpuRefBackend;

impl Backend for CpuRefBackend {
    fn eval_node(
        &self,
        op: &OpKind,
        inputs: &[NodeInput<'_>],
        output_meta: &NodeMeta,
    ) -> Result<Vec<f64>> {
        match op {
            OpKind::Constant | OpKind::Symbol { .. } => Err(SymError::InvalidArgument(
                "Constant/Symbol nodes should be pre-materialized".into(),
            )),
            OpKind::Add => binary_elementwise(inputs, |a, b| a + b),
            OpKind::Sub => binary_elementwise(inputs, |a, b| a - b),
            OpKind::Mul => binary_elementwise(inputs, |a, b| a * b),
            OpKind::Div => binary_elementwise(inputs, |a, b| a / b),
            OpKind::Neg => unary_elementwise(inputs, |x| -x),
            OpKind::Abs => unary_elementwise(inputs, f64::abs),
            OpKind::MatMul => matmul(inputs),
            OpKind::Transpose => transpose(inputs),
            OpKind::Inverse => inverse(inputs),
            OpKind::Dot => {
                let a = require_input(inputs, 0)?;
                let b = require_input(inputs, 1)?;
                if a.data.len() != b.data.len() {
                    return Err(mismatch("dot", a.shape, b.shape));
                }
                Ok(vec![a.data.iter().zip(b.data).map(|(x, y)| x * y).sum()])
            }
            OpKind::Norm1 => {
                let a = require_input(inputs, 0)?;
                Ok(vec![a.data.iter().map(|x| x.abs()).sum()])
            }
            OpKind::Norm2 => {
                let a = require_input(inputs, 0)?;
                Ok(vec![a.data.iter().map(|x| x * x).sum::<f64>().sqrt()])
            }
            OpKind::Broadcast { target } => broadcast(inputs, *target),
            OpKind::Slice { region } => slice(inputs, *region, output_meta.shape),
            OpKind::SetSlice { region } => set_slice(inputs, *region),
        }
    }
}

fn mismatch(op: &'static str, lhs: Shape, rhs: Shape) -> SymError {
    SymError::ShapeMismatch { op, lhs, rhs }
}

fn require_input<'a>(inputs: &'a [NodeInput<'_>], idx: usize) -> Result<&'a NodeInput<'a>> {
    inputs
        .get(idx)
        .ok_or_else(|| SymError::InvalidArgument(format!("expected input at index {idx}")))
}

fn unary_elementwise(inputs: &[NodeInput<'_>], f: fn(f64) -> f64) -> Result<Vec<f64>> {
    let a = require_input(inputs, 0)?;
    Ok(a.data.iter().map(|&x| f(x)).collect())
}

fn binary_elementwise(inputs: &[NodeInput<'_>], f: fn(f64, f64) -> f64) -> Result<Vec<f64>> {
    let a = require_input(inputs, 0)?;
    let b = require_input(inputs, 1)?;
    if a.shape != b.shape {
        return Err(mismatch("elementwise", a.shape, b.shape));
    }
    Ok(a.data
        .iter()
        .zip(b.data.iter())
        .map(|(&x, &y)| f(x, y))
        .collect())
}

fn matmul(inputs: &[NodeInput<'_>]) -> Result<Vec<f64>> {
    let a = require_input(inputs, 0)?;
    let b = require_input(inputs, 1)?;

    let (m, k) = (a.shape.rows, a.shape.cols);
    let (k2, n) = (b.shape.rows, b.shape.cols);
    if k != k2 {
        return Err(mismatch("mtimes", a.shape, b.shape));
    }

    let mut data = vec![0.0f64; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0f64;
            for p in 0..k {
                sum += a.data[i * k + p] * b.data[p * n + j];
            }
            data[i * n + j] = sum;
        }
    }
    Ok(data)
}

fn transpose(inputs: &[NodeInput<'_>]) -> Result<Vec<f64>> {
    let a = require_input(inputs, 0)?;
    let (rows, cols) = (a.shape.rows, a.shape.cols);
    let mut result = vec![0.0f64; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            result[c * rows + r] = a.data[r * cols + c];
        }
    }
    Ok(result)
}

/// Gauss-Jordan elimination with partial pivoting.
fn inverse(inputs: &[NodeInput<'_>]) -> Result<Vec<f64>> {
    let a = require_input(inputs, 0)?;
    if !a.shape.is_square() {
        return Err(mismatch("inv", a.shape, a.shape.transposed()));
    }
    let n = a.shape.rows;
    let scale = a.data.iter().fold(0.0f64, |m, x| m.max(x.abs())).max(1.0);

    let mut lhs = a.data.to_vec();
    let mut inv = vec![0.0f64; n * n];
    for i in 0..n {
        inv[i * n + i] = 1.0;
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| lhs[r1 * n + col].abs().total_cmp(&lhs[r2 * n + col].abs()))
            .unwrap_or(col);
        let pivot = lhs[pivot_row * n + col];
        if !pivot.is_finite() || pivot.abs() <= SINGULAR_TOLERANCE * scale {
            return Err(SymError::Singular);
        }
        if pivot_row != col {
            for c in 0..n {
                lhs.swap(col * n + c, pivot_row * n + c);
                inv.swap(col * n + c, pivot_row * n + c);
            }
        }
        for c in 0..n {
            lhs[col * n + c] /= pivot;
            inv[col * n + c] /= pivot;
        }
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = lhs[r * n + col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..n {
                lhs[r * n + c] -= factor * lhs[col * n + c];
                inv[r * n + c] -= factor * inv[col * n + c];
            }
        }
    }
    Ok(inv)
}

fn broadcast(inputs: &[NodeInput<'_>], target: Shape) -> Result<Vec<f64>> {
    let a = require_input(inputs, 0)?;
    match a.data {
        [x] => Ok(vec![*x; target.numel()]),
        data if a.shape == target => Ok(data.to_vec()),
        _ => Err(mismatch("repmat", a.shape, target)),
    }
}

fn slice(inputs: &[NodeInput<'_>], region: Region, out: Shape) -> Result<Vec<f64>> {
    let a = require_input(inputs, 0)?;
    if !region.fits_in(a.shape) {
        return Err(SymError::InvalidAccess {
            region,
            shape: a.shape,
        });
    }
    let cols = a.shape.cols;
    let mut result = Vec::with_capacity(out.numel());
    for r in region.row..region.row + region.rows {
        let start = r * cols + region.col;
        result.extend_from_slice(&a.data[start..start + region.cols]);
    }
    Ok(result)
}

fn set_slice(inputs: &[NodeInput<'_>], region: Region) -> Result<Vec<f64>> {
    let base = require_input(inputs, 0)?;
    let value = require_input(inputs, 1)?;
    let mut result = base.data.to_vec();
    write_region(&mut result, base.shape, region, value)?;
    Ok(result)
}

/// Overwrite `region` of the row-major `base` buffer with `value`.
///
/// Shared with the stream, which substitutes in place when the base buffer
/// has no other consumer.
pub(crate) fn write_region(
    base: &mut [f64],
    shape: Shape,
    region: Region,
    value: &NodeInput<'_>,
) -> Result<()> {
    if !region.fits_in(shape) || base.len() != shape.numel() {
        return Err(SymError::InvalidAccess { region, shape });
    }
    if value.shape != region.shape() || value.data.len() != region.shape().numel() {
        return Err(mismatch("set_slice", region.shape(), value.shape));
    }
    let cols = shape.cols;
    for (i, r) in (region.row..region.row + region.rows).enumerate() {
        let dst = r * cols + region.col;
        let src = i * region.cols;
        base[dst..dst + region.cols].copy_from_slice(&value.data[src..src + region.cols]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(rows: usize, cols: usize) -> NodeMeta {
        NodeMeta {
            shape: Shape::new(rows, cols),
        }
    }

    fn input(data: &[f64], rows: usize, cols: usize) -> NodeInput<'_> {
        NodeInput {
            data,
            shape: Shape::new(rows, cols),
        }
    }

    #[test]
    fn test_add() {
        let result = CpuRefBackend
            .eval_node(
                &OpKind::Add,
                &[input(&[1.0, 2.0, 3.0], 3, 1), input(&[4.0, 5.0, 6.0], 3, 1)],
                &meta(3, 1),
            )
            .unwrap();
        assert_eq!(result, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_matmul() {
        let result = CpuRefBackend
            .eval_node(
                &OpKind::MatMul,
                &[
                    input(&[1.0, 2.0, 3.0, 4.0], 2, 2),
                    input(&[5.0, 6.0, 7.0, 8.0], 2, 2),
                ],
                &meta(2, 2),
            )
            .unwrap();
        assert_eq!(result, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_transpose() {
        // [[1,2,3],[4,5,6]] transposed = [[1,4],[2,5],[3,6]]
        let result = CpuRefBackend
            .eval_node(
                &OpKind::Transpose,
                &[input(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3)],
                &meta(3, 2),
            )
            .unwrap();
        assert_eq!(result, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_inverse() {
        let result = CpuRefBackend
            .eval_node(
                &OpKind::Inverse,
                &[input(&[4.0, 7.0, 2.0, 6.0], 2, 2)],
                &meta(2, 2),
            )
            .unwrap();
        let expected = [0.6, -0.7, -0.2, 0.4];
        for (r, e) in result.iter().zip(expected) {
            assert!((r - e).abs() < 1e-12, "{result:?}");
        }
    }

    #[test]
    fn test_inverse_needs_pivoting() {
        let result = CpuRefBackend
            .eval_node(
                &OpKind::Inverse,
                &[input(&[0.0, 1.0, 1.0, 0.0], 2, 2)],
                &meta(2, 2),
            )
            .unwrap();
        assert_eq!(result, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_inverse_singular() {
        let err = CpuRefBackend
            .eval_node(
                &OpKind::Inverse,
                &[input(&[1.0, 2.0, 2.0, 4.0], 2, 2)],
                &meta(2, 2),
            )
            .unwrap_err();
        assert!(matches!(err, SymError::Singular));
    }

    #[test]
    fn test_norms() {
        let data = [3.0, -4.0];
        let n1 = CpuRefBackend
            .eval_node(&OpKind::Norm1, &[input(&data, 2, 1)], &meta(1, 1))
            .unwrap();
        let n2 = CpuRefBackend
            .eval_node(&OpKind::Norm2, &[input(&data, 2, 1)], &meta(1, 1))
            .unwrap();
        assert_eq!(n1, vec![7.0]);
        assert_eq!(n2, vec![5.0]);
    }

    #[test]
    fn test_slice_and_set_slice() {
        let base = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let region = Region::new(1, 1, 2, 2);
        let got = CpuRefBackend
            .eval_node(&OpKind::Slice { region }, &[input(&base, 3, 3)], &meta(2, 2))
            .unwrap();
        assert_eq!(got, vec![5.0, 6.0, 8.0, 9.0]);

        let set = CpuRefBackend
            .eval_node(
                &OpKind::SetSlice { region },
                &[input(&base, 3, 3), input(&[0.0; 4], 2, 2)],
                &meta(3, 3),
            )
            .unwrap();
        assert_eq!(set, vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 7.0, 0.0, 0.0]);
    }

    #[test]
    fn test_write_region_in_place() {
        let mut buf = vec![0.0; 6];
        write_region(
            &mut buf,
            Shape::new(2, 3),
            Region::new(0, 1, 2, 1),
            &input(&[7.0, 8.0], 2, 1),
        )
        .unwrap();
        assert_eq!(buf, vec![0.0, 7.0, 0.0, 0.0, 8.0, 0.0]);

        let err = write_region(
            &mut buf,
            Shape::new(2, 3),
            Region::new(1, 2, 2, 1),
            &input(&[1.0, 1.0], 2, 1),
        )
        .unwrap_err();
        assert!(matches!(err, SymError::InvalidAccess { .. }));
        assert_eq!(buf, vec![0.0, 7.0, 0.0, 0.0, 8.0, 0.0]);
    }

    #[test]
    fn test_broadcast_scalar() {
        let got = CpuRefBackend
            .eval_node(
                &OpKind::Broadcast {
                    target: Shape::new(2, 3),
                },
                &[input(&[2.5], 1, 1)],
                &meta(2, 3),
            )
            .unwrap();
        assert_eq!(got, vec![2.5; 6]);
    }
}
