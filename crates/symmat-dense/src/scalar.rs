//! SymScalar — a 1×1 symbolic value.

use symmat_core::{Bindings, Expr, Result, Shape, SymError};

use crate::traits::AsExpr;

/// A symbolic scalar: an expression whose shape is always 1×1.
///
/// Returned by element reads, `dot` and the norms.
#[derive(Clone)]
pub struct SymScalar {
    expr: Expr,
}

impl SymScalar {
    /// A numeric constant.
    pub fn new(value: f64) -> Self {
        Self {
            expr: Expr::scalar(value),
        }
    }

    /// A fresh free scalar symbol.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self {
            expr: Expr::symbol(name, Shape::scalar()),
        }
    }

    pub fn from_expr(expr: Expr) -> Result<Self> {
        if !expr.shape().is_scalar() {
            return Err(SymError::ShapeMismatch {
                op: "scalar",
                lhs: Shape::scalar(),
                rhs: expr.shape(),
            });
        }
        Ok(Self { expr })
    }

    /// Callers guarantee `expr` is 1×1.
    pub(crate) fn wrap(expr: Expr) -> Self {
        debug_assert!(expr.shape().is_scalar(), "scalar wraps a {}", expr.shape());
        Self { expr }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    pub fn abs(&self) -> SymScalar {
        Self::wrap(self.expr.abs())
    }

    /// Numeric value under `bindings`.
    pub fn value(&self, bindings: &Bindings) -> Result<f64> {
        let data = self.expr.eval(bindings)?;
        data.first().copied().ok_or_else(|| {
            SymError::InvalidArgument(format!("scalar {} evaluated to no data", self.expr.node_id()))
        })
    }

    /// Numeric value of a symbol-free scalar.
    pub fn to_f64(&self) -> Result<f64> {
        self.value(&Bindings::new())
    }

    /// The payload when this scalar is a literal constant.
    pub fn as_constant(&self) -> Option<f64> {
        self.expr.as_constant().and_then(|v| v.first().copied())
    }
}

impl From<f64> for SymScalar {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl TryFrom<Expr> for SymScalar {
    type Error = SymError;

    fn try_from(expr: Expr) -> Result<Self> {
        Self::from_expr(expr)
    }
}

impl AsExpr for SymScalar {
    fn shape(&self) -> Shape {
        Shape::scalar()
    }

    fn to_expr(&self) -> Result<Expr> {
        Ok(self.expr.clone())
    }
}

impl PartialEq for SymScalar {
    fn eq(&self, other: &Self) -> bool {
        self.expr.is_equal(&other.expr)
    }
}

impl std::fmt::Debug for SymScalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SymScalar").field(&self.expr.node_id()).finish()
    }
}

impl std::fmt::Display for SymScalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.expr, f)
    }
}
