//! FixedMatrix — a symbolic matrix whose shape is part of its type.

use symmat_core::{Bindings, Expr, Region, Result, Shape, SymError};

use crate::dynamic::DynMatrix;
use crate::scalar::SymScalar;
use crate::traits::AsExpr;

/// An `R`×`C` symbolic matrix. Operations between fixed matrices have their
/// shapes checked by the compiler.
#[derive(Clone)]
pub struct FixedMatrix<const R: usize, const C: usize> {
    expr: Expr,
}

pub type Vector3 = FixedMatrix<3, 1>;
pub type Matrix3 = FixedMatrix<3, 3>;
/// Six-dimensional motion or force vector.
pub type SpatialVector = FixedMatrix<6, 1>;
pub type SpatialMatrix = FixedMatrix<6, 6>;

impl<const R: usize, const C: usize> FixedMatrix<R, C> {
    pub const ROWS: usize = R;
    pub const COLS: usize = C;
    pub const SHAPE: Shape = Shape::new(R, C);

    pub fn zeros() -> Self {
        Self::wrap(Expr::zeros(Self::SHAPE))
    }

    pub fn from_rows(rows: [[f64; C]; R]) -> Self {
        Self::wrap(Expr::from_fn(Self::SHAPE, |i, j| rows[i][j]))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::wrap(Expr::symbol(name, Self::SHAPE))
    }

    /// Adopt an expression, checking that it is `R`×`C`.
    pub fn from_expr(expr: Expr) -> Result<Self> {
        if expr.shape() != Self::SHAPE {
            return Err(SymError::ShapeMismatch {
                op: "fixed",
                lhs: Self::SHAPE,
                rhs: expr.shape(),
            });
        }
        Ok(Self { expr })
    }

    pub(crate) fn wrap(expr: Expr) -> Self {
        debug_assert_eq!(expr.shape(), Self::SHAPE);
        Self { expr }
    }

    pub fn from_dyn(m: &DynMatrix) -> Result<Self> {
        Self::from_expr(m.expr().clone())
    }

    pub fn to_dyn(&self) -> DynMatrix {
        DynMatrix::from_expr(self.expr.clone())
    }

    pub fn at(&self, i: usize, j: usize) -> Result<SymScalar> {
        Ok(SymScalar::wrap(self.expr.slice(Region::cell(i, j))?))
    }

    /// Replace the element at `(i, j)` with a 1×1 value.
    pub fn set(&mut self, i: usize, j: usize, value: &impl AsExpr) -> Result<()> {
        let value = value.to_expr_in(&self.expr.stream())?;
        self.expr = self.expr.set_slice(Region::cell(i, j), &value)?;
        Ok(())
    }

    pub fn transpose(&self) -> FixedMatrix<C, R> {
        FixedMatrix::wrap(self.expr.transpose())
    }

    pub fn abs(&self) -> Self {
        Self::wrap(self.expr.abs())
    }

    /// Sum of absolute values (L1), matching `DynMatrix::norm`.
    pub fn norm(&self) -> SymScalar {
        SymScalar::wrap(self.expr.norm_1())
    }

    /// Euclidean (L2) norm, matching `DynMatrix::squared_norm`.
    pub fn squared_norm(&self) -> SymScalar {
        SymScalar::wrap(self.expr.norm_2())
    }

    pub fn eval(&self, bindings: &Bindings) -> Result<Vec<f64>> {
        self.expr.eval(bindings)
    }

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

impl<const N: usize> FixedMatrix<N, N> {
    pub fn identity() -> Self {
        Self::wrap(Expr::identity(N))
    }

    /// Symbolic inverse; a singular value is reported at evaluation.
    pub fn inverse(&self) -> Result<Self> {
        Ok(Self::wrap(self.expr.inverse()?))
    }
}

impl<const N: usize> FixedMatrix<N, 1> {
    pub fn dot(&self, other: &Self) -> Result<SymScalar> {
        Ok(SymScalar::wrap(self.expr.dot(&other.expr)?))
    }
}

impl<const R: usize, const C: usize> Default for FixedMatrix<R, C> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<const R: usize, const C: usize> AsExpr for FixedMatrix<R, C> {
    fn shape(&self) -> Shape {
        Self::SHAPE
    }

    fn to_expr(&self) -> Result<Expr> {
        Ok(self.expr.clone())
    }
}

impl<const R: usize, const C: usize> From<FixedMatrix<R, C>> for DynMatrix {
    fn from(m: FixedMatrix<R, C>) -> Self {
        DynMatrix::from_expr(m.expr)
    }
}

impl<const R: usize, const C: usize> TryFrom<DynMatrix> for FixedMatrix<R, C> {
    type Error = SymError;

    fn try_from(m: DynMatrix) -> Result<Self> {
        Self::from_expr(m.into_expr())
    }
}

impl<const R: usize, const C: usize> PartialEq for FixedMatrix<R, C> {
    fn eq(&self, other: &Self) -> bool {
        self.expr.is_equal(&other.expr)
    }
}

impl<const R: usize, const C: usize> PartialEq<DynMatrix> for FixedMatrix<R, C> {
    fn eq(&self, other: &DynMatrix) -> bool {
        other.is_equal(self)
    }
}

impl<const R: usize, const C: usize> PartialEq<FixedMatrix<R, C>> for DynMatrix {
    fn eq(&self, other: &FixedMatrix<R, C>) -> bool {
        self.is_equal(other)
    }
}

impl<const R: usize, const C: usize> std::fmt::Debug for FixedMatrix<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FixedMatrix<{R}, {C}>({})", self.expr.node_id())
    }
}

impl<const R: usize, const C: usize> std::fmt::Display for FixedMatrix<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.expr, f)
    }
}
