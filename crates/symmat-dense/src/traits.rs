//! The capability shared by every matrix-like operand.

use std::sync::Arc;

use symmat_core::{Expr, Result, Shape, Stream};

/// Anything that can stand in as a symbolic matrix operand.
///
/// Operators are written once against this trait; the per-type impls in
/// `ops` only exist because the coherence rules need a concrete `Self`.
pub trait AsExpr {
    fn shape(&self) -> Shape;

    /// The expression node for the current value.
    ///
    /// Views read through their parent, so this can fail when the region no
    /// longer fits.
    fn to_expr(&self) -> Result<Expr>;

    /// The expression node for the current value, for combining with an
    /// operand that lives in `stream`.
    ///
    /// Values that already own a node keep it. Plain numbers are built
    /// directly in `stream`.
    fn to_expr_in(&self, _stream: &Arc<Stream>) -> Result<Expr> {
        self.to_expr()
    }
}

impl AsExpr for Expr {
    fn shape(&self) -> Shape {
        Expr::shape(self)
    }

    fn to_expr(&self) -> Result<Expr> {
        Ok(self.clone())
    }
}

/// Plain numbers are 1×1 constants, in the default stream unless placed
/// next to another operand.
impl AsExpr for f64 {
    fn shape(&self) -> Shape {
        Shape::scalar()
    }

    fn to_expr(&self) -> Result<Expr> {
        Ok(Expr::scalar(*self))
    }

    fn to_expr_in(&self, stream: &Arc<Stream>) -> Result<Expr> {
        Ok(Expr::scalar_in(stream, *self))
    }
}

impl<T: AsExpr + ?Sized> AsExpr for &T {
    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn to_expr(&self) -> Result<Expr> {
        (**self).to_expr()
    }

    fn to_expr_in(&self, stream: &Arc<Stream>) -> Result<Expr> {
        (**self).to_expr_in(stream)
    }
}

impl<T: AsExpr + ?Sized> AsExpr for &mut T {
    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn to_expr(&self) -> Result<Expr> {
        (**self).to_expr()
    }

    fn to_expr_in(&self, stream: &Arc<Stream>) -> Result<Expr> {
        (**self).to_expr_in(stream)
    }
}
