//! Arithmetic operators across the matrix-like types.
//!
//! Every operator returns `Result`, since shapes are only checked when the
//! expression is built. `*` is the matrix product, with scalar broadcast when
//! either side is 1×1. `/` divides by a 1×1 value, or element-wise for equal
//! shapes. The result is a `DynMatrix` unless both operands carry their
//! shape in the type.

use std::ops::{Add, Div, Mul, Neg, Sub};

use symmat_core::{Expr, Result};

use crate::dynamic::DynMatrix;
use crate::fixed::FixedMatrix;
use crate::scalar::SymScalar;
use crate::traits::AsExpr;
use crate::view::{ScalarView, SliceView};

type BinaryOp = fn(&Expr, &Expr) -> Result<Expr>;

fn lift<L, R>(lhs: &L, rhs: &R, op: BinaryOp) -> Result<Expr>
where
    L: AsExpr + ?Sized,
    R: AsExpr + ?Sized,
{
    let lhs = lhs.to_expr()?;
    op(&lhs, &rhs.to_expr_in(&lhs.stream())?)
}

// Literals are placed in the stream of the matrix they combine with.
fn lift_literal_rhs<L: AsExpr + ?Sized>(lhs: &L, value: f64, op: BinaryOp) -> Result<Expr> {
    lift(lhs, &value, op)
}

fn lift_literal_lhs<R: AsExpr + ?Sized>(value: f64, rhs: &R, op: BinaryOp) -> Result<Expr> {
    let rhs = rhs.to_expr()?;
    op(&Expr::scalar_in(&rhs.stream(), value), &rhs)
}

// ---------------------------------------------------------------------------
// runtime-shaped left operand: any right operand, DynMatrix out

macro_rules! impl_dyn_lhs {
    ($([$($lt:lifetime)?] $Lhs:ty),* $(,)?) => {$(
        impl_dyn_lhs!(@op [$($lt)?] $Lhs; Add add Expr::add);
        impl_dyn_lhs!(@op [$($lt)?] $Lhs; Sub sub Expr::sub);
        impl_dyn_lhs!(@op [$($lt)?] $Lhs; Mul mul Expr::mtimes);
        impl_dyn_lhs!(@op [$($lt)?] $Lhs; Div div Expr::div);
    )*};

    (@op [$($lt:lifetime)?] $Lhs:ty; $Trait:ident $method:ident $op:path) => {
        impl<'r, $($lt,)? Rhs: AsExpr + ?Sized> $Trait<&'r Rhs> for &$Lhs {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: &'r Rhs) -> Self::Output {
                lift(self, rhs, $op).map(DynMatrix::from_expr)
            }
        }

        impl<$($lt)?> $Trait<f64> for &$Lhs {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: f64) -> Self::Output {
                lift_literal_rhs(self, rhs, $op).map(DynMatrix::from_expr)
            }
        }

        impl<$($lt)?> $Trait<&$Lhs> for f64 {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: &$Lhs) -> Self::Output {
                lift_literal_lhs(self, rhs, $op).map(DynMatrix::from_expr)
            }
        }
    };
}

impl_dyn_lhs!([] DynMatrix, ['a] SliceView<'a>, ['a] ScalarView<'a>);

// Owned DynMatrix on the left, for chaining results.
macro_rules! impl_dyn_owned {
    ($($Trait:ident $method:ident),*) => {$(
        impl<'r, Rhs: AsExpr + ?Sized> $Trait<&'r Rhs> for DynMatrix {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: &'r Rhs) -> Self::Output {
                (&self).$method(rhs)
            }
        }

        impl $Trait<DynMatrix> for DynMatrix {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: DynMatrix) -> Self::Output {
                (&self).$method(&rhs)
            }
        }

        impl $Trait<f64> for DynMatrix {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: f64) -> Self::Output {
                (&self).$method(rhs)
            }
        }
    )*};
}

impl_dyn_owned!(Add add, Sub sub, Mul mul, Div div);

impl Neg for &DynMatrix {
    type Output = DynMatrix;

    fn neg(self) -> DynMatrix {
        DynMatrix::from_expr(self.expr().neg())
    }
}

impl Neg for DynMatrix {
    type Output = DynMatrix;

    fn neg(self) -> DynMatrix {
        -&self
    }
}

// ---------------------------------------------------------------------------
// fixed-shape left operand

// fixed ± fixed of the same shape stays fixed
macro_rules! impl_fixed_same_shape {
    ($($Trait:ident $method:ident $op:path),*) => {$(
        impl<'r, const R: usize, const C: usize> $Trait<&'r FixedMatrix<R, C>> for &FixedMatrix<R, C> {
            type Output = Result<FixedMatrix<R, C>>;

            fn $method(self, rhs: &'r FixedMatrix<R, C>) -> Self::Output {
                Ok(FixedMatrix::wrap($op(self.expr(), rhs.expr())?))
            }
        }
    )*};
}

impl_fixed_same_shape!(Add add Expr::add, Sub sub Expr::sub);

/// `R`×`K` times `K`×`C` is `R`×`C`.
impl<'r, const R: usize, const K: usize, const C: usize> Mul<&'r FixedMatrix<K, C>>
    for &FixedMatrix<R, K>
{
    type Output = Result<FixedMatrix<R, C>>;

    fn mul(self, rhs: &'r FixedMatrix<K, C>) -> Self::Output {
        Ok(FixedMatrix::wrap(self.expr().matmul(rhs.expr())?))
    }
}

// fixed `op` runtime-shaped: DynMatrix out
macro_rules! impl_fixed_mixed {
    ($([$($lt:lifetime)?] $Rhs:ty),* $(,)?) => {$(
        impl_fixed_mixed!(@op [$($lt)?] $Rhs; Add add Expr::add);
        impl_fixed_mixed!(@op [$($lt)?] $Rhs; Sub sub Expr::sub);
        impl_fixed_mixed!(@op [$($lt)?] $Rhs; Mul mul Expr::mtimes);
        impl_fixed_mixed!(@op [$($lt)?] $Rhs; Div div Expr::div);
    )*};

    (@op [$($lt:lifetime)?] $Rhs:ty; $Trait:ident $method:ident $op:path) => {
        impl<'r, $($lt,)? const R: usize, const C: usize> $Trait<&'r $Rhs> for &FixedMatrix<R, C> {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: &'r $Rhs) -> Self::Output {
                lift(self, rhs, $op).map(DynMatrix::from_expr)
            }
        }
    };
}

impl_fixed_mixed!([] DynMatrix, ['a] SliceView<'a>, ['a] ScalarView<'a>);

// fixed `op` scalar keeps the fixed shape
macro_rules! impl_fixed_scaled {
    ($($Trait:ident $method:ident $op:path),*) => {$(
        impl<'r, const R: usize, const C: usize> $Trait<&'r SymScalar> for &FixedMatrix<R, C> {
            type Output = Result<FixedMatrix<R, C>>;

            fn $method(self, rhs: &'r SymScalar) -> Self::Output {
                Ok(FixedMatrix::wrap($op(self.expr(), rhs.expr())?))
            }
        }

        impl<const R: usize, const C: usize> $Trait<f64> for &FixedMatrix<R, C> {
            type Output = Result<FixedMatrix<R, C>>;

            fn $method(self, rhs: f64) -> Self::Output {
                Ok(FixedMatrix::wrap(lift_literal_rhs(self, rhs, $op)?))
            }
        }
    )*};
}

impl_fixed_scaled!(Mul mul Expr::mtimes, Div div Expr::div);

// Adding a scalar only makes sense for a 1×1 fixed matrix, which the
// runtime check enforces.
impl<'r, const R: usize, const C: usize> Add<&'r SymScalar> for &FixedMatrix<R, C> {
    type Output = Result<DynMatrix>;

    fn add(self, rhs: &'r SymScalar) -> Self::Output {
        lift(self, rhs, Expr::add).map(DynMatrix::from_expr)
    }
}

impl<'r, const R: usize, const C: usize> Sub<&'r SymScalar> for &FixedMatrix<R, C> {
    type Output = Result<DynMatrix>;

    fn sub(self, rhs: &'r SymScalar) -> Self::Output {
        lift(self, rhs, Expr::sub).map(DynMatrix::from_expr)
    }
}

impl<const R: usize, const C: usize> Mul<&FixedMatrix<R, C>> for f64 {
    type Output = Result<FixedMatrix<R, C>>;

    fn mul(self, rhs: &FixedMatrix<R, C>) -> Self::Output {
        Ok(FixedMatrix::wrap(lift_literal_lhs(self, rhs, Expr::mtimes)?))
    }
}

impl<const R: usize, const C: usize> Neg for &FixedMatrix<R, C> {
    type Output = FixedMatrix<R, C>;

    fn neg(self) -> Self::Output {
        FixedMatrix::wrap(self.expr().neg())
    }
}

// ---------------------------------------------------------------------------
// scalar left operand

macro_rules! impl_scalar_lhs {
    ($($Trait:ident $method:ident $op:path),*) => {$(
        impl<'r> $Trait<&'r SymScalar> for &SymScalar {
            type Output = Result<SymScalar>;

            fn $method(self, rhs: &'r SymScalar) -> Self::Output {
                Ok(SymScalar::wrap($op(self.expr(), rhs.expr())?))
            }
        }

        impl $Trait<f64> for &SymScalar {
            type Output = Result<SymScalar>;

            fn $method(self, rhs: f64) -> Self::Output {
                Ok(SymScalar::wrap(lift_literal_rhs(self, rhs, $op)?))
            }
        }

        impl $Trait<&SymScalar> for f64 {
            type Output = Result<SymScalar>;

            fn $method(self, rhs: &SymScalar) -> Self::Output {
                Ok(SymScalar::wrap(lift_literal_lhs(self, rhs, $op)?))
            }
        }

        impl<'r> $Trait<&'r DynMatrix> for &SymScalar {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: &'r DynMatrix) -> Self::Output {
                lift(self, rhs, $op).map(DynMatrix::from_expr)
            }
        }

        impl<'r, 'a> $Trait<&'r SliceView<'a>> for &SymScalar {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: &'r SliceView<'a>) -> Self::Output {
                lift(self, rhs, $op).map(DynMatrix::from_expr)
            }
        }

        impl<'r, 'a> $Trait<&'r ScalarView<'a>> for &SymScalar {
            type Output = Result<DynMatrix>;

            fn $method(self, rhs: &'r ScalarView<'a>) -> Self::Output {
                lift(self, rhs, $op).map(DynMatrix::from_expr)
            }
        }
    )*};
}

impl_scalar_lhs!(
    Add add Expr::add,
    Sub sub Expr::sub,
    Mul mul Expr::mtimes,
    Div div Expr::div
);

impl<'r, const R: usize, const C: usize> Mul<&'r FixedMatrix<R, C>> for &SymScalar {
    type Output = Result<FixedMatrix<R, C>>;

    fn mul(self, rhs: &'r FixedMatrix<R, C>) -> Self::Output {
        Ok(FixedMatrix::wrap(self.expr().mtimes(rhs.expr())?))
    }
}

impl<'r, const R: usize, const C: usize> Add<&'r FixedMatrix<R, C>> for &SymScalar {
    type Output = Result<DynMatrix>;

    fn add(self, rhs: &'r FixedMatrix<R, C>) -> Self::Output {
        lift(self, rhs, Expr::add).map(DynMatrix::from_expr)
    }
}

impl<'r, const R: usize, const C: usize> Sub<&'r FixedMatrix<R, C>> for &SymScalar {
    type Output = Result<DynMatrix>;

    fn sub(self, rhs: &'r FixedMatrix<R, C>) -> Self::Output {
        lift(self, rhs, Expr::sub).map(DynMatrix::from_expr)
    }
}

impl Neg for &SymScalar {
    type Output = SymScalar;

    fn neg(self) -> SymScalar {
        SymScalar::wrap(self.expr().neg())
    }
}
