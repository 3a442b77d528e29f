//! Immutable expression graph IR.
//!
//! Expressions are handles to reference-counted nodes. A node never changes
//! after construction: an operation interns a new node that points at its
//! inputs. Pure operations are hash-consed, so building the same operation
//! over the same live inputs twice yields the same node. A node is released
//! as soon as the last expression (or downstream node) holding it goes away.

use crate::types::{Region, Shape};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Process-wide id source. Ids are never reused, so an id identifies one
/// node even after that node has been released.
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

/// Interning tables are swept for dead entries once they grow past this.
const MIN_SWEEP: usize = 1024;

/// Unique identifier for a node in the expression graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Metadata about a node (known at construction).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeMeta {
    pub shape: Shape,
}

/// Shared handle to a node.
pub type NodeRef = Arc<Node>;

/// A node in the expression graph.
pub struct Node {
    pub id: NodeId,
    pub op: OpKind,
    pub inputs: SmallVec<[NodeRef; 2]>,
    pub meta: NodeMeta,
    payload: Option<Vec<f64>>,
    live: Arc<AtomicUsize>,
}

impl Node {
    /// Row-major data of a constant node.
    pub fn payload(&self) -> Option<&[f64]> {
        self.payload.as_deref()
    }

    pub fn input_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.iter().map(|input| input.id)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("op", &self.op)
            .field("inputs", &self.input_ids().collect::<SmallVec<[NodeId; 2]>>())
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        if self.inputs.is_empty() {
            return;
        }
        // Unlink iteratively: a recursive drop takes one frame per node.
        let mut stack: Vec<NodeRef> = self.inputs.drain(..).collect();
        while let Some(input) = stack.pop() {
            if let Some(mut node) = Arc::into_inner(input) {
                stack.extend(node.inputs.drain(..));
            }
        }
    }
}

/// The set of operations supported by the graph IR.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    // ── Sources ─────────────────────────────────────────────────────────
    /// Numeric constant (payload stored on the node).
    Constant,
    /// Free symbol, bound to numeric values only at evaluation time.
    Symbol { name: String },

    // ── Elementwise ─────────────────────────────────────────────────────
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Abs,

    // ── Linear algebra ──────────────────────────────────────────────────
    MatMul,
    Transpose,
    Inverse,
    /// Inner product of two equally sized vectors → 1×1.
    Dot,
    /// Sum of absolute values → 1×1.
    Norm1,
    /// Euclidean (Frobenius) norm → 1×1.
    Norm2,

    // ── Broadcasting ────────────────────────────────────────────────────
    /// Repeat a 1×1 input to `target`.
    Broadcast { target: Shape },

    // ── Slicing ─────────────────────────────────────────────────────────
    /// Extract `region` from the input.
    Slice { region: Region },
    /// Inputs `[base, value]`: `base` with `region` replaced by `value`.
    SetSlice { region: Region },
}

impl OpKind {
    /// Whether identical (op, inputs, meta) triples may share one node.
    ///
    /// Symbols are distinct variables even when their names coincide.
    pub fn is_cse_eligible(&self) -> bool {
        !matches!(self, OpKind::Constant | OpKind::Symbol { .. })
    }

    /// Short mnemonic used when rendering expressions.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpKind::Constant => "const",
            OpKind::Symbol { .. } => "sym",
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::Mul => "mul",
            OpKind::Div => "div",
            OpKind::Neg => "neg",
            OpKind::Abs => "fabs",
            OpKind::MatMul => "mtimes",
            OpKind::Transpose => "T",
            OpKind::Inverse => "inv",
            OpKind::Dot => "dot",
            OpKind::Norm1 => "norm_1",
            OpKind::Norm2 => "norm_2",
            OpKind::Broadcast { .. } => "repmat",
            OpKind::Slice { .. } => "slice",
            OpKind::SetSlice { .. } => "set_slice",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CseKey {
    op: OpKind,
    inputs: SmallVec<[NodeId; 2]>,
    meta: NodeMeta,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ConstKey {
    meta: NodeMeta,
    payload_hash: u64,
}

/// Interning tables for one stream.
///
/// The graph does not own nodes. It keeps weak entries so that a node that is
/// still alive can be shared, and counts how many of its nodes are alive.
#[derive(Debug)]
pub struct Graph {
    cse_ops: HashMap<CseKey, Weak<Node>>,
    cse_consts: HashMap<ConstKey, Weak<Node>>,
    live: Arc<AtomicUsize>,
    sweep_at: usize,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            cse_ops: HashMap::new(),
            cse_consts: HashMap::new(),
            live: Arc::new(AtomicUsize::new(0)),
            sweep_at: MIN_SWEEP,
        }
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(
        &self,
        op: OpKind,
        inputs: SmallVec<[NodeRef; 2]>,
        meta: NodeMeta,
        payload: Option<Vec<f64>>,
    ) -> NodeRef {
        self.live.fetch_add(1, Ordering::Relaxed);
        Arc::new(Node {
            id: NodeId::fresh(),
            op,
            inputs,
            meta,
            payload,
            live: Arc::clone(&self.live),
        })
    }

    /// Add a node without CSE.
    pub fn add_node_raw(
        &mut self,
        op: OpKind,
        inputs: SmallVec<[NodeRef; 2]>,
        meta: NodeMeta,
    ) -> NodeRef {
        self.alloc(op, inputs, meta, None)
    }

    /// Add an operation node, reusing a live identical node when the op is
    /// CSE-eligible.
    pub fn intern_node(
        &mut self,
        op: OpKind,
        inputs: SmallVec<[NodeRef; 2]>,
        meta: NodeMeta,
    ) -> NodeRef {
        if !op.is_cse_eligible() {
            return self.add_node_raw(op, inputs, meta);
        }

        let mut inputs = inputs;
        normalize_inputs_for_cse(&op, &mut inputs);

        let key = CseKey {
            op,
            inputs: inputs.iter().map(|input| input.id).collect(),
            meta,
        };
        if let Some(existing) = self.cse_ops.get(&key).and_then(Weak::upgrade) {
            return existing;
        }

        let node = self.alloc(key.op.clone(), inputs, key.meta.clone(), None);
        self.cse_ops.insert(key, Arc::downgrade(&node));
        self.maybe_sweep();
        node
    }

    /// Add a numeric constant. Identical live payloads of identical shape
    /// share a node.
    pub fn intern_constant(&mut self, data: Vec<f64>, meta: NodeMeta) -> NodeRef {
        let key = ConstKey {
            meta: meta.clone(),
            payload_hash: hash_f64_payload(&data),
        };

        let existing = self.cse_consts.get(&key).and_then(Weak::upgrade);
        if let Some(existing) = &existing
            && existing.payload().is_some_and(|p| bitwise_eq(p, &data))
        {
            return Arc::clone(existing);
        }

        let node = self.alloc(OpKind::Constant, SmallVec::new(), meta, Some(data));
        // A hash collision with a live constant keeps the older entry.
        if existing.is_none() {
            self.cse_consts.insert(key, Arc::downgrade(&node));
            self.maybe_sweep();
        }
        node
    }

    fn maybe_sweep(&mut self) {
        if self.table_len() < self.sweep_at {
            return;
        }
        self.cse_ops.retain(|_, node| node.strong_count() > 0);
        self.cse_consts.retain(|_, node| node.strong_count() > 0);
        self.sweep_at = (2 * self.table_len()).max(MIN_SWEEP);
    }

    /// Number of nodes created through this graph that are still alive.
    pub fn live_nodes(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Number of interning entries, dead ones included until the next sweep.
    pub fn table_len(&self) -> usize {
        self.cse_ops.len() + self.cse_consts.len()
    }
}

/// Whether `a` and `b` are provably the same expression.
///
/// Identical nodes are always equal. Otherwise nodes are compared by op,
/// shape and constant payload, recursing into inputs for at most `depth`
/// levels. Distinct symbols are never equal.
pub fn is_equal(a: &Node, b: &Node, depth: usize) -> bool {
    if a.id == b.id {
        return true;
    }
    if a.meta != b.meta || a.op != b.op {
        return false;
    }
    match a.op {
        OpKind::Symbol { .. } => false,
        OpKind::Constant => match (a.payload(), b.payload()) {
            (Some(pa), Some(pb)) => bitwise_eq(pa, pb),
            _ => false,
        },
        _ => {
            depth > 0
                && a.inputs.len() == b.inputs.len()
                && a.inputs
                    .iter()
                    .zip(b.inputs.iter())
                    .all(|(x, y)| is_equal(x, y, depth - 1))
        }
    }
}

/// Topological sort of the graph rooted at `outputs`, inputs first.
///
/// Iterative, so update chains of any length can be ordered.
pub fn topo_sort(outputs: &[NodeRef]) -> Vec<NodeRef> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    // (node, inputs already pushed)
    let mut stack: Vec<(&NodeRef, bool)> = outputs.iter().rev().map(|n| (n, false)).collect();

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(Arc::clone(node));
            continue;
        }
        if !visited.insert(node.id) {
            continue;
        }
        stack.push((node, true));
        for input in node.inputs.iter().rev() {
            if !visited.contains(&input.id) {
                stack.push((input, false));
            }
        }
    }

    order
}

/// Render the expression rooted at `node`, expanding at most `depth` levels
/// of operations.
pub fn render(node: &Node, depth: usize) -> String {
    let mut out = String::new();
    render_into(node, depth, &mut out);
    out
}

fn render_into(node: &Node, depth: usize, out: &mut String) {
    use std::fmt::Write;

    match &node.op {
        OpKind::Symbol { name } => out.push_str(name),
        OpKind::Constant => match node.payload() {
            Some([x]) => {
                let _ = write!(out, "{x}");
            }
            Some(data) if data.iter().all(|&x| x == 0.0) => {
                let _ = write!(out, "zeros{}", node.meta.shape);
            }
            _ => {
                let _ = write!(out, "const{}", node.meta.shape);
            }
        },
        _ if depth == 0 => {
            let _ = write!(out, "{}", node.id);
        }
        op => {
            out.push_str(op.mnemonic());
            out.push('(');
            for (i, input) in node.inputs.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(input, depth - 1, out);
            }
            match op {
                OpKind::Slice { region } | OpKind::SetSlice { region } => {
                    let _ = write!(out, "; {region}");
                }
                OpKind::Broadcast { target } => {
                    let _ = write!(out, "; {target}");
                }
                _ => {}
            }
            out.push(')');
        }
    }
}

pub fn hash_f64_payload(data: &[f64]) -> u64 {
    let mut h = std::collections::hash_map::DefaultHasher::new();
    data.len().hash(&mut h);
    for &x in data {
        x.to_bits().hash(&mut h);
    }
    h.finish()
}

fn bitwise_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn normalize_inputs_for_cse(op: &OpKind, inputs: &mut SmallVec<[NodeRef; 2]>) {
    if matches!(op, OpKind::Add | OpKind::Mul) && inputs.len() == 2 && inputs[0].id > inputs[1].id
    {
        inputs.swap(0, 1);
    }
}
