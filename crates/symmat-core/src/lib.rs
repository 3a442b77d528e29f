//! Immutable expression graph backing symbolic matrices.
//!
//! `symmat-core` provides the foundational types (`Expr`, `Shape`, `Region`)
//! and the `Stream` that builds and evaluates nodes. Nodes are
//! reference-counted: an `Expr` keeps its subgraph alive, and dropping the
//! last handle releases it. Expressions are built lazily: each operation
//! checks shapes up front and records a node; numeric evaluation through a
//! `Backend` happens only on request.
//!
//! # Backends
//!
//! - `CpuRefBackend`: pure Rust correctness oracle, used by the default stream

pub mod backend;
pub mod config;
pub mod cpu_kernels;
pub mod expr;
pub mod graph;
pub mod types;

pub use backend::{Backend, Bindings, Stream, default_stream};
pub use config::GraphConfig;
pub use expr::Expr;
pub use graph::{NodeId, NodeRef};
pub use types::{Region, Shape};

pub type Result<T> = std::result::Result<T, SymError>;

#[derive(thiserror::Error, Debug)]
pub enum SymError {
    #[error("Shape mismatch in `{op}`: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    #[error("Invalid access: {region} is outside a matrix of shape {shape}")]
    InvalidAccess { region: Region, shape: Shape },

    #[error("Matrix is singular")]
    Singular,

    #[error("Unbound symbol: {0}")]
    UnboundSymbol(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
