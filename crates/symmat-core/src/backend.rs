//! Backend trait and Stream — where expression nodes are built and evaluated.
//!
//! A `Backend` knows how to evaluate a single graph node numerically
//! (op + inputs → output). A `Stream` binds a `Backend` to the interning
//! `Graph`, handing out nodes to `Expr` handles and scheduling evaluation.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::GraphConfig;
use crate::expr::Expr;
use crate::cpu_kernels::write_region;
use crate::graph::{self, Graph, Node, NodeId, NodeMeta, NodeRef, OpKind};
use crate::types::Shape;
use crate::{Result, SymError};

/// Materialized input data passed to a backend for evaluation.
pub struct NodeInput<'a> {
    pub data: &'a [f64],
    pub shape: Shape,
}

/// Pluggable numeric backend.
///
/// Backends evaluate individual graph nodes. The `Stream` handles scheduling
/// (topological sort), constants and symbol bindings; the backend only
/// implements the arithmetic. Data is row-major.
pub trait Backend: Send + Sync {
    /// Evaluate a single op node given its materialized inputs.
    fn eval_node(&self, op: &OpKind, inputs: &[NodeInput<'_>], output_meta: &NodeMeta)
    -> Result<Vec<f64>>;
}

/// Numeric values for free symbols, keyed by the symbol's node.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: HashMap<NodeId, Vec<f64>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `symbol` to row-major `values`.
    pub fn bind(&mut self, symbol: &Expr, values: &[f64]) -> Result<&mut Self> {
        if !matches!(symbol.node().op, OpKind::Symbol { .. }) {
            return Err(SymError::InvalidArgument(format!(
                "cannot bind {}: not a free symbol",
                symbol.node_id()
            )));
        }
        let expected = symbol.shape().numel();
        if values.len() != expected {
            return Err(SymError::InvalidArgument(format!(
                "binding for {} has {} values, shape {} needs {}",
                symbol.node_id(),
                values.len(),
                symbol.shape(),
                expected,
            )));
        }
        self.values.insert(symbol.node_id(), values.to_vec());
        Ok(self)
    }

    /// Builder-style `bind`.
    pub fn with(mut self, symbol: &Expr, values: &[f64]) -> Result<Self> {
        self.bind(symbol, values)?;
        Ok(self)
    }

    pub fn get(&self, id: NodeId) -> Option<&[f64]> {
        self.values.get(&id).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Evaluated buffers, keyed by node. Constants and bound symbols are
/// borrowed rather than copied.
type Buffers<'a> = HashMap<NodeId, Cow<'a, [f64]>>;

/// An expression graph bound to a numeric backend.
///
/// Expression handles own their nodes; the stream only interns them so that
/// identical live operations are shared. Handles keep the stream alive
/// through an `Arc`.
pub struct Stream {
    graph: Mutex<Graph>,
    backend: Box<dyn Backend>,
    config: GraphConfig,
}

impl Stream {
    /// Create a new stream with the given backend and environment config.
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self::with_config(backend, GraphConfig::from_env())
    }

    pub fn with_config(backend: Box<dyn Backend>, config: GraphConfig) -> Self {
        debug!(cse = config.cse, eq_depth = config.eq_depth, "created expression stream");
        Self {
            graph: Mutex::new(Graph::new()),
            backend,
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a constant node. Identical live constants (same shape + payload)
    /// are deduplicated.
    pub fn add_constant(&self, data: Vec<f64>, meta: NodeMeta) -> NodeRef {
        self.graph().intern_constant(data, meta)
    }

    /// Add a fresh free symbol. Never deduplicated.
    pub fn add_symbol(&self, name: impl Into<String>, meta: NodeMeta) -> NodeRef {
        self.graph()
            .add_node_raw(OpKind::Symbol { name: name.into() }, SmallVec::new(), meta)
    }

    /// Add an operation node to the graph.
    ///
    /// With CSE enabled, identical (op, inputs, meta) return the existing
    /// node while it is alive.
    pub fn add_op(&self, op: OpKind, inputs: SmallVec<[NodeRef; 2]>, meta: NodeMeta) -> NodeRef {
        let mut graph = self.graph();
        if self.config.cse {
            graph.intern_node(op, inputs, meta)
        } else {
            graph.add_node_raw(op, inputs, meta)
        }
    }

    /// Structural equality using the configured depth.
    pub fn is_equal(&self, a: &Node, b: &Node) -> bool {
        self.is_equal_depth(a, b, self.config.eq_depth)
    }

    pub fn is_equal_depth(&self, a: &Node, b: &Node, depth: usize) -> bool {
        graph::is_equal(a, b, depth)
    }

    /// Evaluate `output` numerically, resolving symbols through `bindings`.
    ///
    /// Runs without the graph lock. An intermediate buffer is released once
    /// its last consumer has run, and a substitution whose base has no other
    /// consumer writes into the base buffer instead of copying it.
    pub fn eval(&self, output: &NodeRef, bindings: &Bindings) -> Result<Vec<f64>> {
        let order = graph::topo_sort(std::slice::from_ref(output));
        trace!(output = %output.id, nodes = order.len(), "evaluating subgraph");

        let mut pending: HashMap<NodeId, usize> = HashMap::with_capacity(order.len());
        for node in &order {
            for id in node.input_ids() {
                *pending.entry(id).or_default() += 1;
            }
        }

        let mut values: Buffers<'_> = HashMap::new();
        for node in &order {
            let result = self.eval_one(node, bindings, &mut values, &pending)?;
            for id in node.input_ids() {
                if let Some(count) = pending.get_mut(&id) {
                    *count -= 1;
                    if *count == 0 {
                        values.remove(&id);
                    }
                }
            }
            values.insert(node.id, result);
        }

        values.remove(&output.id).map(Cow::into_owned).ok_or_else(|| {
            SymError::InvalidArgument(format!("output {} was not evaluated", output.id))
        })
    }

    fn eval_one<'a>(
        &self,
        node: &'a Node,
        bindings: &'a Bindings,
        values: &mut Buffers<'a>,
        pending: &HashMap<NodeId, usize>,
    ) -> Result<Cow<'a, [f64]>> {
        match &node.op {
            OpKind::Constant => node.payload().map(Cow::Borrowed).ok_or_else(|| {
                SymError::InvalidArgument(format!("constant {} has no payload", node.id))
            }),
            OpKind::Symbol { name } => bindings
                .get(node.id)
                .map(Cow::Borrowed)
                .ok_or_else(|| SymError::UnboundSymbol(name.clone())),
            OpKind::SetSlice { region }
                if node
                    .inputs
                    .first()
                    .is_some_and(|base| pending.get(&base.id) == Some(&1)) =>
            {
                let [base, value] = node.inputs.as_slice() else {
                    return Err(SymError::InvalidArgument(format!(
                        "set_slice {} expects two inputs",
                        node.id
                    )));
                };
                let mut data = values
                    .remove(&base.id)
                    .ok_or_else(|| missing_input(base.id, node.id))?
                    .into_owned();
                let patch = values
                    .get(&value.id)
                    .ok_or_else(|| missing_input(value.id, node.id))?;
                let patch = NodeInput {
                    data: patch,
                    shape: value.meta.shape,
                };
                write_region(&mut data, base.meta.shape, *region, &patch)?;
                Ok(Cow::Owned(data))
            }
            op => {
                let inputs = node
                    .inputs
                    .iter()
                    .map(|input| {
                        let data = values
                            .get(&input.id)
                            .ok_or_else(|| missing_input(input.id, node.id))?;
                        Ok(NodeInput {
                            data,
                            shape: input.meta.shape,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Cow::Owned(self.backend.eval_node(op, &inputs, &node.meta)?))
            }
        }
    }

    /// Number of nodes built in this stream that are still referenced.
    pub fn live_node_count(&self) -> usize {
        self.graph().live_nodes()
    }
}

fn missing_input(input: NodeId, consumer: NodeId) -> SymError {
    SymError::InvalidArgument(format!(
        "input {input} should be evaluated before {consumer}"
    ))
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The default stream, using the CPU reference backend and the environment
/// config.
static DEFAULT_STREAM: LazyLock<Arc<Stream>> =
    LazyLock::new(|| Arc::new(Stream::new(Box::new(crate::cpu_kernels::CpuRefBackend))));

/// Get the default expression stream.
pub fn default_stream() -> Arc<Stream> {
    Arc::clone(&DEFAULT_STREAM)
}
