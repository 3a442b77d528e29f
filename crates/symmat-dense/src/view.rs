//! Writable views into a `DynMatrix`.
//!
//! A view mutably borrows its parent for as long as it lives. Writing
//! through it substitutes the region in the parent's expression and replaces
//! the parent's held node. Only one view can exist per matrix at a time:
//!
//! ```compile_fail
//! use symmat_dense::DynMatrix;
//!
//! let mut m = DynMatrix::zero(3, 3);
//! let mut a = m.at_mut(0, 0).unwrap();
//! let mut b = m.at_mut(1, 1).unwrap();
//! a.set_value(1.0).unwrap();
//! b.set_value(2.0).unwrap();
//! ```
//!
//! Taking the accesses one after the other is fine:
//!
//! ```
//! use symmat_dense::DynMatrix;
//!
//! let mut m = DynMatrix::zero(3, 3);
//! m.at_mut(0, 0)?.set_value(1.0)?;
//! m.at_mut(1, 1)?.set_value(2.0)?;
//! assert_eq!(m.at(0, 0)?.to_f64()?, 1.0);
//! assert_eq!(m.at(1, 1)?.to_f64()?, 2.0);
//! # Ok::<(), symmat_dense::SymError>(())
//! ```

use symmat_core::{Expr, Region, Result, Shape};

use crate::dynamic::DynMatrix;
use crate::scalar::SymScalar;
use crate::traits::AsExpr;

/// A rectangular region of a borrowed `DynMatrix`.
pub struct SliceView<'a> {
    parent: &'a mut DynMatrix,
    region: Region,
}

impl<'a> SliceView<'a> {
    pub(crate) fn new(parent: &'a mut DynMatrix, region: Region) -> Result<Self> {
        parent.check_region(region)?;
        Ok(Self { parent, region })
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn shape(&self) -> Shape {
        self.region.shape()
    }

    pub fn rows(&self) -> usize {
        self.region.rows
    }

    pub fn cols(&self) -> usize {
        self.region.cols
    }

    /// The current value of the region.
    pub fn get(&self) -> Result<DynMatrix> {
        Ok(DynMatrix::from_expr(self.read()?))
    }

    fn read(&self) -> Result<Expr> {
        self.parent.expr().slice(self.region)
    }

    /// Substitute the region with `value`, which must have the region's shape.
    pub fn set(&mut self, value: &impl AsExpr) -> Result<()> {
        let value = self.parent.operand(value)?;
        self.parent.set_region(self.region, &value)
    }

    pub fn set_zero(&mut self) -> Result<()> {
        let zeros = Expr::zeros_in(&self.parent.expr().stream(), self.shape());
        self.parent.set_region(self.region, &zeros)
    }

    pub fn try_add_assign(&mut self, rhs: &impl AsExpr) -> Result<()> {
        let sum = self.read()?.add(&self.parent.operand(rhs)?)?;
        self.parent.set_region(self.region, &sum)
    }

    pub fn try_sub_assign(&mut self, rhs: &impl AsExpr) -> Result<()> {
        let difference = self.read()?.sub(&self.parent.operand(rhs)?)?;
        self.parent.set_region(self.region, &difference)
    }
}

impl AsExpr for SliceView<'_> {
    fn shape(&self) -> Shape {
        self.region.shape()
    }

    fn to_expr(&self) -> Result<Expr> {
        self.read()
    }
}

impl std::fmt::Debug for SliceView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceView")
            .field("region", &self.region)
            .field("parent", &self.parent)
            .finish()
    }
}

/// A single element of a borrowed `DynMatrix`.
pub struct ScalarView<'a> {
    inner: SliceView<'a>,
}

impl<'a> ScalarView<'a> {
    pub(crate) fn new(parent: &'a mut DynMatrix, row: usize, col: usize) -> Result<Self> {
        Ok(Self {
            inner: SliceView::new(parent, Region::cell(row, col))?,
        })
    }

    pub fn row(&self) -> usize {
        self.inner.region.row
    }

    pub fn col(&self) -> usize {
        self.inner.region.col
    }

    pub fn get(&self) -> Result<SymScalar> {
        Ok(SymScalar::wrap(self.inner.read()?))
    }

    /// Assign a 1×1 value.
    pub fn set(&mut self, value: &impl AsExpr) -> Result<()> {
        self.inner.set(value)
    }

    /// Assign a numeric constant.
    pub fn set_value(&mut self, value: f64) -> Result<()> {
        let value = Expr::scalar_in(&self.inner.parent.expr().stream(), value);
        self.inner.parent.set_region(self.inner.region, &value)
    }

    pub fn try_add_assign(&mut self, rhs: &impl AsExpr) -> Result<()> {
        self.inner.try_add_assign(rhs)
    }

    pub fn try_sub_assign(&mut self, rhs: &impl AsExpr) -> Result<()> {
        self.inner.try_sub_assign(rhs)
    }
}

impl AsExpr for ScalarView<'_> {
    fn shape(&self) -> Shape {
        Shape::scalar()
    }

    fn to_expr(&self) -> Result<Expr> {
        self.inner.read()
    }
}

impl std::fmt::Debug for ScalarView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarView")
            .field("row", &self.row())
            .field("col", &self.col())
            .finish()
    }
}
