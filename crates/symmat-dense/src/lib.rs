//! Dense symbolic matrices with value semantics.
//!
//! `DynMatrix` looks like an ordinary mutable matrix, but each element is a
//! node in a `symmat-core` expression graph. Writes never modify a node: they
//! build a new expression with the region substituted and swap it in.
//!
//! ```
//! use symmat_dense::{DynMatrix, SymScalar};
//!
//! let mut m = DynMatrix::zero(3, 3);
//! m.at_mut(1, 1)?.set_value(5.0)?;
//! assert_eq!(m.rows(), 3);
//! assert_eq!(m.at(1, 1)?.to_f64()?, 5.0);
//!
//! let i = DynMatrix::identity(2);
//! let b = (&i + &(&i * 3.0)?)?;
//! assert_eq!(b.to_vec()?, vec![4.0, 0.0, 0.0, 4.0]);
//!
//! let t = SymScalar::symbol("t");
//! let scaled = (&t * &i)?;
//! assert_eq!(scaled.shape(), i.shape());
//! # Ok::<(), symmat_dense::SymError>(())
//! ```
//!
//! # Types
//!
//! - `DynMatrix`: runtime shape
//! - `FixedMatrix<R, C>`: shape in the type (`Vector3`, `Matrix3`,
//!   `SpatialVector`, `SpatialMatrix`)
//! - `SymScalar`: 1×1 value returned by element reads and reductions
//! - `SliceView` / `ScalarView`: writable regions borrowed from a `DynMatrix`

pub mod dynamic;
pub mod fixed;
pub mod ops;
pub mod scalar;
pub mod traits;
pub mod view;

pub use dynamic::{DynMatrix, fabs};
pub use fixed::{FixedMatrix, Matrix3, SpatialMatrix, SpatialVector, Vector3};
pub use scalar::SymScalar;
pub use traits::AsExpr;
pub use view::{ScalarView, SliceView};

pub use symmat_core::{Bindings, Expr, Region, Result, Shape, SymError};
