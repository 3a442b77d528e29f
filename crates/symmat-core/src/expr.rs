//! Expr — a handle to an immutable node in the expression graph.
//!
//! An `Expr` owns a reference to its node, which in turn owns its inputs, so
//! a subgraph lives exactly as long as some handle reaches it.
//!
//! Every operation validates shapes eagerly and interns a new node; nothing
//! is computed until `eval()` (or `to_vec()`) is called. A handful of local
//! rewrites keep common patterns structurally simple:
//!
//! - `T(T(x))` is `x`
//! - slicing the whole of `x` is `x`
//! - substituting the whole of `x` yields the substituted value
//! - slicing the region that was just substituted yields the substituted value

use std::sync::Arc;

use smallvec::SmallVec;

use crate::backend::{Bindings, Stream, default_stream};
use crate::graph::{self, NodeMeta, NodeRef, OpKind};
use crate::types::{Region, Shape};
use crate::{NodeId, Result, SymError};

/// Depth used by `Display`.
const DISPLAY_DEPTH: usize = 16;

/// A symbolic matrix expression.
///
/// Cloning is cheap and shares the underlying node.
#[derive(Clone)]
pub struct Expr {
    node: NodeRef,
    stream: Arc<Stream>,
}

impl Expr {
    // ── Constructors ────────────────────────────────────────────────────

    /// A matrix of zeros.
    pub fn zeros(shape: Shape) -> Self {
        Self::zeros_in(&default_stream(), shape)
    }

    pub fn zeros_in(stream: &Arc<Stream>, shape: Shape) -> Self {
        Self::constant_in(stream, vec![0.0; shape.numel()], shape)
    }

    /// The `n`×`n` identity.
    pub fn identity(n: usize) -> Self {
        Self::identity_in(&default_stream(), n)
    }

    pub fn identity_in(stream: &Arc<Stream>, n: usize) -> Self {
        Self::from_fn_in(stream, Shape::new(n, n), |r, c| if r == c { 1.0 } else { 0.0 })
    }

    /// A constant whose element `(r, c)` is `f(r, c)`.
    pub fn from_fn(shape: Shape, f: impl FnMut(usize, usize) -> f64) -> Self {
        Self::from_fn_in(&default_stream(), shape, f)
    }

    pub fn from_fn_in(
        stream: &Arc<Stream>,
        shape: Shape,
        mut f: impl FnMut(usize, usize) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(shape.numel());
        for r in 0..shape.rows {
            for c in 0..shape.cols {
                data.push(f(r, c));
            }
        }
        Self::constant_in(stream, data, shape)
    }

    /// A 1×1 constant.
    pub fn scalar(value: f64) -> Self {
        Self::scalar_in(&default_stream(), value)
    }

    pub fn scalar_in(stream: &Arc<Stream>, value: f64) -> Self {
        Self::constant_in(stream, vec![value], Shape::scalar())
    }

    /// A constant from row-major data.
    pub fn from_data(data: &[f64], shape: Shape) -> Result<Self> {
        Self::from_data_in(&default_stream(), data, shape)
    }

    pub fn from_data_in(stream: &Arc<Stream>, data: &[f64], shape: Shape) -> Result<Self> {
        let expected = shape.numel();
        if data.len() != expected {
            return Err(SymError::InvalidArgument(format!(
                "data length {} does not match shape {} (expected {})",
                data.len(),
                shape,
                expected,
            )));
        }
        Ok(Self::constant_in(stream, data.to_vec(), shape))
    }

    /// A fresh free symbol.
    pub fn symbol(name: impl Into<String>, shape: Shape) -> Self {
        Self::symbol_in(&default_stream(), name, shape)
    }

    pub fn symbol_in(stream: &Arc<Stream>, name: impl Into<String>, shape: Shape) -> Self {
        let node = stream.add_symbol(name, NodeMeta { shape });
        Self::from_node(node, Arc::clone(stream))
    }

    fn constant_in(stream: &Arc<Stream>, data: Vec<f64>, shape: Shape) -> Self {
        let node = stream.add_constant(data, NodeMeta { shape });
        Self::from_node(node, Arc::clone(stream))
    }

    /// Wrap a node built in `stream`.
    pub fn from_node(node: NodeRef, stream: Arc<Stream>) -> Self {
        Self { node, stream }
    }

    fn lazy_op(&self, op: OpKind, inputs: SmallVec<[NodeRef; 2]>, shape: Shape) -> Self {
        let node = self.stream.add_op(op, inputs, NodeMeta { shape });
        Self::from_node(node, Arc::clone(&self.stream))
    }

    fn unary(&self, op: OpKind, shape: Shape) -> Self {
        let mut inputs = SmallVec::new();
        inputs.push(Arc::clone(&self.node));
        self.lazy_op(op, inputs, shape)
    }

    fn binary(&self, rhs: &Expr, op: OpKind, shape: Shape) -> Result<Self> {
        self.same_stream(rhs)?;
        let inputs = SmallVec::from_buf([Arc::clone(&self.node), Arc::clone(&rhs.node)]);
        Ok(self.lazy_op(op, inputs, shape))
    }

    fn same_stream(&self, rhs: &Expr) -> Result<()> {
        if Arc::ptr_eq(&self.stream, &rhs.stream) {
            Ok(())
        } else {
            Err(SymError::InvalidArgument(
                "operands belong to different streams".into(),
            ))
        }
    }

    fn require_same_shape(&self, rhs: &Expr, op: &'static str) -> Result<()> {
        if self.shape() != rhs.shape() {
            return Err(SymError::ShapeMismatch {
                op,
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        Ok(())
    }

    // ── Elementwise ops ─────────────────────────────────────────────────

    /// Element-wise addition; shapes must match.
    pub fn add(&self, rhs: &Expr) -> Result<Expr> {
        self.require_same_shape(rhs, "add")?;
        self.binary(rhs, OpKind::Add, self.shape())
    }

    /// Element-wise subtraction; shapes must match.
    pub fn sub(&self, rhs: &Expr) -> Result<Expr> {
        self.require_same_shape(rhs, "sub")?;
        self.binary(rhs, OpKind::Sub, self.shape())
    }

    /// Element-wise (Hadamard) product; shapes must match.
    pub fn mul_elem(&self, rhs: &Expr) -> Result<Expr> {
        self.require_same_shape(rhs, "mul")?;
        self.binary(rhs, OpKind::Mul, self.shape())
    }

    /// Division by a 1×1 value, or element-wise division for equal shapes.
    pub fn div(&self, rhs: &Expr) -> Result<Expr> {
        if rhs.shape().is_scalar() && !self.shape().is_scalar() {
            let denom = rhs.broadcast_to(self.shape())?;
            return self.binary(&denom, OpKind::Div, self.shape());
        }
        self.require_same_shape(rhs, "div")?;
        self.binary(rhs, OpKind::Div, self.shape())
    }

    /// Element-wise negation.
    pub fn neg(&self) -> Expr {
        self.unary(OpKind::Neg, self.shape())
    }

    /// Element-wise absolute value.
    pub fn abs(&self) -> Expr {
        self.unary(OpKind::Abs, self.shape())
    }

    // ── Linear algebra ──────────────────────────────────────────────────

    /// Strict matrix product: `self.cols() == rhs.rows()`.
    pub fn matmul(&self, rhs: &Expr) -> Result<Expr> {
        if self.shape().cols != rhs.shape().rows {
            return Err(SymError::ShapeMismatch {
                op: "mtimes",
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        self.binary(rhs, OpKind::MatMul, Shape::new(self.shape().rows, rhs.shape().cols))
    }

    /// Matrix product with scalar broadcast: when either operand is 1×1 the
    /// other is scaled element-wise.
    pub fn mtimes(&self, rhs: &Expr) -> Result<Expr> {
        match (self.shape().is_scalar(), rhs.shape().is_scalar()) {
            (_, true) => self.scale(rhs),
            (true, false) => rhs.scale(self),
            (false, false) => self.matmul(rhs),
        }
    }

    /// Multiply every element by the 1×1 `factor`.
    pub fn scale(&self, factor: &Expr) -> Result<Expr> {
        if !factor.shape().is_scalar() {
            return Err(SymError::ShapeMismatch {
                op: "scale",
                lhs: self.shape(),
                rhs: factor.shape(),
            });
        }
        if self.shape().is_scalar() {
            return self.binary(factor, OpKind::Mul, self.shape());
        }
        let factor = factor.broadcast_to(self.shape())?;
        self.binary(&factor, OpKind::Mul, self.shape())
    }

    /// Transpose. `T(T(x))` folds back to `x`.
    pub fn transpose(&self) -> Expr {
        if matches!(self.node.op, OpKind::Transpose)
            && let Some(inner) = self.node.inputs.first()
        {
            return Expr::from_node(Arc::clone(inner), Arc::clone(&self.stream));
        }
        self.unary(OpKind::Transpose, self.shape().transposed())
    }

    /// Symbolic inverse. Requires a square operand; singularity is only
    /// detected when the expression is evaluated.
    pub fn inverse(&self) -> Result<Expr> {
        if !self.shape().is_square() {
            return Err(SymError::ShapeMismatch {
                op: "inv",
                lhs: self.shape(),
                rhs: self.shape().transposed(),
            });
        }
        Ok(self.unary(OpKind::Inverse, self.shape()))
    }

    /// Inner product of two vectors with the same number of elements.
    pub fn dot(&self, rhs: &Expr) -> Result<Expr> {
        if !self.shape().is_vector()
            || !rhs.shape().is_vector()
            || self.shape().numel() != rhs.shape().numel()
        {
            return Err(SymError::ShapeMismatch {
                op: "dot",
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        self.binary(rhs, OpKind::Dot, Shape::scalar())
    }

    /// Sum of absolute values (1×1).
    pub fn norm_1(&self) -> Expr {
        self.unary(OpKind::Norm1, Shape::scalar())
    }

    /// Euclidean / Frobenius norm (1×1).
    pub fn norm_2(&self) -> Expr {
        self.unary(OpKind::Norm2, Shape::scalar())
    }

    /// Repeat a 1×1 expression to `target`.
    pub fn broadcast_to(&self, target: Shape) -> Result<Expr> {
        if self.shape() == target {
            return Ok(self.clone());
        }
        if !self.shape().is_scalar() {
            return Err(SymError::ShapeMismatch {
                op: "repmat",
                lhs: self.shape(),
                rhs: target,
            });
        }
        Ok(self.unary(OpKind::Broadcast { target }, target))
    }

    // ── Slicing ─────────────────────────────────────────────────────────

    /// Extract `region` as a new expression.
    pub fn slice(&self, region: Region) -> Result<Expr> {
        self.check_region(region)?;
        if region.covers(self.shape()) {
            return Ok(self.clone());
        }
        if self.node.op == (OpKind::SetSlice { region })
            && let Some(value) = self.node.inputs.get(1)
        {
            return Ok(Expr::from_node(Arc::clone(value), Arc::clone(&self.stream)));
        }
        Ok(self.unary(OpKind::Slice { region }, region.shape()))
    }

    /// A copy of `self` with `region` replaced by `value`.
    pub fn set_slice(&self, region: Region, value: &Expr) -> Result<Expr> {
        self.check_region(region)?;
        if value.shape() != region.shape() {
            return Err(SymError::ShapeMismatch {
                op: "set_slice",
                lhs: region.shape(),
                rhs: value.shape(),
            });
        }
        if region.covers(self.shape()) {
            self.same_stream(value)?;
            return Ok(value.clone());
        }
        self.binary(value, OpKind::SetSlice { region }, self.shape())
    }

    fn check_region(&self, region: Region) -> Result<()> {
        if !region.fits_in(self.shape()) {
            return Err(SymError::InvalidAccess {
                region,
                shape: self.shape(),
            });
        }
        Ok(())
    }

    // ── Comparison ──────────────────────────────────────────────────────

    /// Whether the backend can prove both expressions are the same symbolic
    /// graph. This is not a numeric comparison.
    pub fn is_equal(&self, rhs: &Expr) -> bool {
        Arc::ptr_eq(&self.stream, &rhs.stream)
            && self.shape() == rhs.shape()
            && self.stream.is_equal(&self.node, &rhs.node)
    }

    /// Constant payload, when the node is a numeric constant.
    pub fn as_constant(&self) -> Option<Vec<f64>> {
        self.node.payload().map(<[f64]>::to_vec)
    }

    // ── Materialization ─────────────────────────────────────────────────

    /// Evaluate numerically (row-major) with `bindings` for free symbols.
    pub fn eval(&self, bindings: &Bindings) -> Result<Vec<f64>> {
        self.stream.eval(&self.node, bindings)
    }

    /// Evaluate an expression that has no free symbols.
    pub fn to_vec(&self) -> Result<Vec<f64>> {
        self.eval(&Bindings::new())
    }

    /// Render the expression, expanding at most `depth` levels.
    pub fn render(&self, depth: usize) -> String {
        graph::render(&self.node, depth)
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn shape(&self) -> Shape {
        self.node.meta.shape
    }

    pub fn rows(&self) -> usize {
        self.shape().rows
    }

    pub fn cols(&self) -> usize {
        self.shape().cols
    }

    pub fn node_id(&self) -> NodeId {
        self.node.id
    }

    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn stream(&self) -> Arc<Stream> {
        Arc::clone(&self.stream)
    }
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expr")
            .field("node", &self.node.id)
            .field("shape", &self.shape())
            .finish()
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(DISPLAY_DEPTH))
    }
}

impl<'a> std::ops::Add for &'a Expr {
    type Output = Result<Expr>;
    fn add(self, rhs: &'a Expr) -> Self::Output {
        Expr::add(self, rhs)
    }
}

impl<'a> std::ops::Sub for &'a Expr {
    type Output = Result<Expr>;
    fn sub(self, rhs: &'a Expr) -> Self::Output {
        Expr::sub(self, rhs)
    }
}

/// Matrix product (`mtimes`), not element-wise.
impl<'a> std::ops::Mul for &'a Expr {
    type Output = Result<Expr>;
    fn mul(self, rhs: &'a Expr) -> Self::Output {
        self.mtimes(rhs)
    }
}

impl std::ops::Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Self::Output {
        Expr::neg(self)
    }
}
