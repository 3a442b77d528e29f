//! DynMatrix — a runtime-shaped symbolic matrix.
//!
//! The matrix owns exactly one expression. Every mutation (element or block
//! assignment, compound arithmetic, resize) builds a new expression and
//! replaces the held one, so clones never observe each other's writes.

use symmat_core::{Bindings, Expr, Region, Result, Shape, SymError};
use tracing::debug;

use crate::fixed::FixedMatrix;
use crate::scalar::SymScalar;
use crate::traits::AsExpr;
use crate::view::{ScalarView, SliceView};

/// A dense matrix of symbolic expressions whose shape is only known at
/// runtime.
#[derive(Clone)]
pub struct DynMatrix {
    expr: Expr,
}

impl Default for DynMatrix {
    /// A 1×1 zero.
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl DynMatrix {
    // ── Construction ────────────────────────────────────────────────────

    /// A zero-filled matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::zero(rows, cols)
    }

    /// Wrap an existing expression; the shape is taken from it.
    pub fn from_expr(expr: Expr) -> Self {
        Self { expr }
    }

    /// A constant matrix from row-major data.
    pub fn from_row_slice(rows: usize, cols: usize, data: &[f64]) -> Result<Self> {
        Ok(Self::from_expr(Expr::from_data(data, Shape::new(rows, cols))?))
    }

    /// A constant matrix whose element `(i, j)` is `f(i, j)`.
    pub fn from_fn(rows: usize, cols: usize, f: impl FnMut(usize, usize) -> f64) -> Self {
        Self::from_expr(Expr::from_fn(Shape::new(rows, cols), f))
    }

    /// A free symbol of the given shape.
    pub fn symbol(name: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self::from_expr(Expr::symbol(name, Shape::new(rows, cols)))
    }

    pub fn zero(rows: usize, cols: usize) -> Self {
        Self::from_expr(Expr::zeros(Shape::new(rows, cols)))
    }

    /// Reset to zeros, keeping the shape.
    pub fn set_zero(&mut self) {
        self.expr = Expr::zeros_in(&self.expr.stream(), self.shape());
    }

    pub fn identity(size: usize) -> Self {
        Self::from_expr(Expr::identity(size))
    }

    /// Conservative resize: the top-left overlap is kept and new cells are
    /// zero.
    pub fn resize(&mut self, rows: usize, cols: usize) -> Result<()> {
        let from = self.shape();
        let to = Shape::new(rows, cols);
        debug!(%from, %to, "resizing symbolic matrix");

        let mut resized = Expr::zeros_in(&self.expr.stream(), to);
        for i in 0..from.rows.min(rows) {
            for j in 0..from.cols.min(cols) {
                let cell = Region::cell(i, j);
                resized = resized.set_slice(cell, &self.expr.slice(cell)?)?;
            }
        }
        self.expr = resized;
        Ok(())
    }

    // ── Shape ───────────────────────────────────────────────────────────

    pub fn shape(&self) -> Shape {
        self.expr.shape()
    }

    pub fn rows(&self) -> usize {
        self.expr.rows()
    }

    pub fn cols(&self) -> usize {
        self.expr.cols()
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.shape().numel()
    }

    // ── Element and block access ────────────────────────────────────────

    /// The element at `(i, j)`.
    pub fn at(&self, i: usize, j: usize) -> Result<SymScalar> {
        Ok(SymScalar::wrap(self.expr.slice(Region::cell(i, j))?))
    }

    /// Shorthand for `at(i, 0)`, for column vectors.
    pub fn elem(&self, i: usize) -> Result<SymScalar> {
        self.at(i, 0)
    }

    /// A writable view of the element at `(i, j)`.
    pub fn at_mut(&mut self, i: usize, j: usize) -> Result<ScalarView<'_>> {
        ScalarView::new(self, i, j)
    }

    pub fn elem_mut(&mut self, i: usize) -> Result<ScalarView<'_>> {
        self.at_mut(i, 0)
    }

    /// Replace the element at `(i, j)` with a 1×1 value.
    ///
    /// Anything larger is a `ShapeMismatch`; use `set_block` for blocks.
    pub fn set(&mut self, i: usize, j: usize, value: &impl AsExpr) -> Result<()> {
        let value = self.operand(value)?;
        self.set_region(Region::cell(i, j), &value)
    }

    /// Copy out a `rows`×`cols` block starting at `(row, col)`.
    pub fn block(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<DynMatrix> {
        let region = Region::new(row, col, rows, cols);
        Ok(Self::from_expr(self.expr.slice(region)?))
    }

    /// Copy out an `H`×`W` block starting at `(row, col)`.
    pub fn fixed_block<const H: usize, const W: usize>(
        &self,
        row: usize,
        col: usize,
    ) -> Result<FixedMatrix<H, W>> {
        FixedMatrix::from_expr(self.block(row, col, H, W)?.into_expr())
    }

    /// A writable view of a block.
    pub fn block_mut(
        &mut self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<SliceView<'_>> {
        SliceView::new(self, Region::new(row, col, rows, cols))
    }

    /// Substitute the block at `(row, col)` with `value`.
    pub fn set_block(&mut self, row: usize, col: usize, value: &impl AsExpr) -> Result<()> {
        let value = self.operand(value)?;
        let shape = value.shape();
        self.set_region(Region::new(row, col, shape.rows, shape.cols), &value)
    }

    pub(crate) fn set_region(&mut self, region: Region, value: &Expr) -> Result<()> {
        self.expr = self.expr.set_slice(region, value)?;
        Ok(())
    }

    /// `value` as an expression, with literals placed in this matrix's
    /// stream.
    pub(crate) fn operand(&self, value: &(impl AsExpr + ?Sized)) -> Result<Expr> {
        value.to_expr_in(&self.expr.stream())
    }

    pub(crate) fn check_region(&self, region: Region) -> Result<()> {
        if !region.fits_in(self.shape()) {
            return Err(SymError::InvalidAccess {
                region,
                shape: self.shape(),
            });
        }
        Ok(())
    }

    // ── Linear algebra ──────────────────────────────────────────────────

    pub fn transpose(&self) -> DynMatrix {
        Self::from_expr(self.expr.transpose())
    }

    /// Symbolic inverse. Fails only for non-square matrices; a singular
    /// value is reported when the result is evaluated.
    pub fn inverse(&self) -> Result<DynMatrix> {
        Ok(Self::from_expr(self.expr.inverse()?))
    }

    /// Inner product with another vector of the same length.
    pub fn dot(&self, other: &impl AsExpr) -> Result<SymScalar> {
        Ok(SymScalar::wrap(self.expr.dot(&self.operand(other)?)?))
    }

    /// Sum of absolute values (L1), not the Euclidean norm.
    ///
    /// Use `norm_2` for the Euclidean norm.
    pub fn norm(&self) -> SymScalar {
        self.norm_1()
    }

    /// Euclidean (L2) norm, not its square.
    pub fn squared_norm(&self) -> SymScalar {
        self.norm_2()
    }

    pub fn norm_1(&self) -> SymScalar {
        SymScalar::wrap(self.expr.norm_1())
    }

    pub fn norm_2(&self) -> SymScalar {
        SymScalar::wrap(self.expr.norm_2())
    }

    /// Element-wise absolute value.
    pub fn abs(&self) -> DynMatrix {
        Self::from_expr(self.expr.abs())
    }

    // ── Compound assignment ─────────────────────────────────────────────
    //
    // The new expression is fully built before it replaces the held one, so
    // an error leaves `self` untouched.

    pub fn try_add_assign(&mut self, rhs: &impl AsExpr) -> Result<()> {
        self.expr = self.expr.add(&self.operand(rhs)?)?;
        Ok(())
    }

    pub fn try_sub_assign(&mut self, rhs: &impl AsExpr) -> Result<()> {
        self.expr = self.expr.sub(&self.operand(rhs)?)?;
        Ok(())
    }

    /// `self = self * rhs` (matrix product, scalar broadcast).
    pub fn try_mul_assign(&mut self, rhs: &impl AsExpr) -> Result<()> {
        self.expr = self.expr.mtimes(&self.operand(rhs)?)?;
        Ok(())
    }

    // ── Comparison and evaluation ───────────────────────────────────────

    /// Structural equality against any matrix-like operand.
    pub fn is_equal(&self, other: &impl AsExpr) -> bool {
        self.operand(other).is_ok_and(|e| self.expr.is_equal(&e))
    }

    /// Row-major numeric values with `bindings` for free symbols.
    pub fn eval(&self, bindings: &Bindings) -> Result<Vec<f64>> {
        self.expr.eval(bindings)
    }

    /// Row-major numeric values of a symbol-free matrix.
    pub fn to_vec(&self) -> Result<Vec<f64>> {
        self.expr.to_vec()
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

/// Element-wise absolute value.
pub fn fabs(m: &DynMatrix) -> DynMatrix {
    m.abs()
}

impl AsExpr for DynMatrix {
    fn shape(&self) -> Shape {
        self.expr.shape()
    }

    fn to_expr(&self) -> Result<Expr> {
        Ok(self.expr.clone())
    }
}

impl From<Expr> for DynMatrix {
    fn from(expr: Expr) -> Self {
        Self::from_expr(expr)
    }
}

impl From<SymScalar> for DynMatrix {
    fn from(s: SymScalar) -> Self {
        Self::from_expr(s.into_expr())
    }
}

impl PartialEq for DynMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.expr.is_equal(&other.expr)
    }
}

impl std::fmt::Debug for DynMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynMatrix")
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("node", &self.expr.node_id())
            .finish()
    }
}

impl std::fmt::Display for DynMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.expr, f)
    }
}
