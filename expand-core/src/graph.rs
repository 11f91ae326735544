//! The partial core-term graph: the expander's output representation, which
//! allows sub-terms to be *not yet known* (spec §3, §4.4).
//!
//! Node identities are opaque and allocated from [`crate::engine::ExpanderState`];
//! a position with no entry in the graph's map is "pending" — a task is
//! expected to fill it in later. The graph is a tree under `parent-of`, not
//! a DAG: a node identity appears as a child in at most one parent position.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::binding::Binding;
use crate::syntax::Syntax;

//====================================================================================================================//
// NodeId
//====================================================================================================================//

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u64);

impl NodeId {
	pub(crate) fn from_raw(id: u64) -> NodeId {
		NodeId(id)
	}
}

impl Debug for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "n#{}", self.0)
	}
}

//====================================================================================================================//
// Core shapes
//====================================================================================================================//

/// A self-evaluating literal payload.
#[derive(Clone, Debug)]
pub enum Lit {
	Sig(u64),
	Bool(bool),
	Str(Arc<str>),
}

/// The sum of core-language constructors, parameterized over how a child
/// position is represented.
///
/// [`CoreFragment`] uses `Syntax` for children not yet expanded (what a
/// primitive macro hands back to the scheduler); the live graph and the
/// finished term both use [`NodeId`] (children already assigned an
/// identity, possibly still pending their own map entry).
#[derive(Clone, Debug)]
pub enum CoreShape<C> {
	Lit(Lit),
	/// Arbitrary syntax embedded wholesale, never itself expanded further —
	/// the translation of `(quote datum)`.
	Quote(Syntax),
	/// A reference to a bound variable.
	Ref(Binding),
	Lambda { params: Vec<Binding>, body: C },
	App { func: C, args: Vec<C> },
}

impl<C> CoreShape<C> {
	/// Rebuilds this shape with every child position transformed by `f`.
	pub fn map_children<D>(self, mut f: impl FnMut(C) -> D) -> CoreShape<D> {
		match self {
			CoreShape::Lit(lit) => CoreShape::Lit(lit),
			CoreShape::Quote(stx) => CoreShape::Quote(stx),
			CoreShape::Ref(binding) => CoreShape::Ref(binding),
			CoreShape::Lambda { params, body } => CoreShape::Lambda { params, body: f(body) },
			CoreShape::App { func, args } => CoreShape::App {
				func: f(func),
				args: args.into_iter().map(f).collect(),
			},
		}
	}
}

/// A fragment of core syntax with unexpanded children, as returned by a
/// primitive macro (spec §4.5.c).
pub type CoreFragment = CoreShape<Syntax>;

/// A fully-resolved shape: every child position is a concrete [`NodeId`].
pub type ResolvedShape = CoreShape<NodeId>;

//====================================================================================================================//
// PartialCoreGraph
//====================================================================================================================//

/// The expander's live, append-only output: a root [`NodeId`] plus the map
/// of every node known so far.
#[derive(Default)]
pub struct PartialCoreGraph {
	root: Option<NodeId>,
	map: HashMap<NodeId, ResolvedShape>,
}

impl PartialCoreGraph {
	pub fn new() -> PartialCoreGraph {
		PartialCoreGraph::default()
	}

	pub fn set_root(&mut self, root: NodeId) {
		self.root = Some(root);
	}

	pub fn root(&self) -> Option<NodeId> {
		self.root
	}

	pub fn insert(&mut self, id: NodeId, shape: ResolvedShape) {
		self.map.insert(id, shape);
	}

	pub fn get(&self, id: NodeId) -> Option<&ResolvedShape> {
		self.map.get(&id)
	}

	/// True once the root and every node transitively reachable from it has
	/// a map entry — i.e. no position is pending any more.
	pub fn is_complete(&self) -> bool {
		match self.root {
			None => false,
			Some(root) => self.is_node_complete(root, &mut std::collections::HashSet::new()),
		}
	}

	/// Like [`PartialCoreGraph::is_complete`], but rooted at an arbitrary
	/// node rather than the graph's root. Used by the engine to wait for a
	/// sub-expansion (e.g. a `let-syntax` right-hand side) to finish without
	/// requiring the whole graph to be done.
	pub fn is_complete_from(&self, id: NodeId) -> bool {
		self.is_node_complete(id, &mut std::collections::HashSet::new())
	}

	fn is_node_complete(&self, id: NodeId, seen: &mut std::collections::HashSet<NodeId>) -> bool {
		if !seen.insert(id) {
			return true; // a node id appears as a child in at most one parent; already checked.
		}
		match self.map.get(&id) {
			None => false,
			Some(CoreShape::Lit(_)) | Some(CoreShape::Quote(_)) | Some(CoreShape::Ref(_)) => true,
			Some(CoreShape::Lambda { body, .. }) => self.is_node_complete(*body, seen),
			Some(CoreShape::App { func, args }) => {
				self.is_node_complete(*func, seen) && args.iter().all(|arg| self.is_node_complete(*arg, seen))
			}
		}
	}

	/// Converts the finished graph into a dense [`HoleTree`] with no holes.
	/// Returns `None` if the graph is not [`PartialCoreGraph::is_complete`].
	pub fn zonk_complete(&self) -> Option<HoleTree> {
		if !self.is_complete() {
			return None;
		}
		Some(zonk(self.root, &self.map))
	}

	/// Zonks the subtree rooted at an arbitrary (already-complete) node,
	/// rather than the graph's own root. Used to read back a `let-syntax`
	/// right-hand side once [`PartialCoreGraph::is_complete_from`] holds for it.
	pub fn zonk_node(&self, id: NodeId) -> HoleTree {
		zonk(Some(id), &self.map)
	}
}

//====================================================================================================================//
// HoleTree, zonk / unzonk
//====================================================================================================================//

/// A tree where missing sub-terms are explicit holes, with no identity
/// arena involved at all. [`unzonk`] and [`zonk`] are the mutually inverse
/// conversions between this representation and a [`PartialCoreGraph`]-style
/// `(root, map)` pair (spec §4.4).
pub enum HoleTree {
	Hole,
	Node(CoreShape<Box<HoleTree>>),
}

/// Turns a [`HoleTree`] into `(root, map)`: every node position — whether a
/// known node or a hole — gets a fresh identity, so a parent can always
/// reference its children's ids; only known-node positions get a map entry.
/// A hole is then exactly what [`zonk`] already expects: an id absent from
/// `map`. This holds at every depth, not just at the root, so a tree with an
/// interior hole (e.g. `App { func: Lit, args: [Hole] }`) still unzonks to a
/// root id with a map entry — only the hole's own position is missing one.
pub fn unzonk(tree: &HoleTree, fresh_id: &mut impl FnMut() -> NodeId) -> (NodeId, HashMap<NodeId, ResolvedShape>) {
	let mut map = HashMap::new();
	let root = unzonk_into(tree, fresh_id, &mut map);
	(root, map)
}

fn unzonk_into(tree: &HoleTree, fresh_id: &mut impl FnMut() -> NodeId, map: &mut HashMap<NodeId, ResolvedShape>) -> NodeId {
	let id = fresh_id();
	if let HoleTree::Node(shape) = tree {
		let shape = shape.clone();
		let resolved = shape.map_children(|child| unzonk_into(&child, fresh_id, map));
		map.insert(id, resolved);
	}
	id
}

/// The inverse of [`unzonk`]: total, and never fails. Wherever a child
/// identity is missing from `map`, produces a hole at that position.
pub fn zonk(root: Option<NodeId>, map: &HashMap<NodeId, ResolvedShape>) -> HoleTree {
	match root {
		None => HoleTree::Hole,
		Some(id) => match map.get(&id) {
			None => HoleTree::Hole,
			Some(shape) => HoleTree::Node(shape.clone().map_children(|child| Box::new(zonk(Some(child), map)))),
		},
	}
}

// `CoreShape<Box<HoleTree>>` needs `Clone` for the recursive walk above;
// `Box<HoleTree>` clones structurally since `HoleTree` itself derives it.
impl Clone for HoleTree {
	fn clone(&self) -> Self {
		match self {
			HoleTree::Hole => HoleTree::Hole,
			HoleTree::Node(shape) => HoleTree::Node(shape.clone()),
		}
	}
}

impl Debug for HoleTree {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			HoleTree::Hole => write!(f, "<hole>"),
			HoleTree::Node(shape) => match shape {
				CoreShape::Lit(lit) => write!(f, "{lit:?}"),
				CoreShape::Quote(stx) => write!(f, "(quote {stx:?})"),
				CoreShape::Ref(binding) => write!(f, "{binding:?}"),
				CoreShape::Lambda { params, body } => write!(f, "(lambda {params:?} {body:?})"),
				CoreShape::App { func, args } => {
					write!(f, "({func:?}")?;
					for arg in args {
						write!(f, " {arg:?}")?;
					}
					write!(f, ")")
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::Counter;

	fn fresh(counter: &Counter) -> NodeId {
		NodeId::from_raw(counter.next())
	}

	fn leaf(n: u64) -> HoleTree {
		HoleTree::Node(CoreShape::Lit(Lit::Sig(n)))
	}

	#[test]
	fn zonk_of_unzonk_is_identity_for_a_complete_tree() {
		let counter = Counter::new();
		let tree = HoleTree::Node(CoreShape::App {
			func: Box::new(leaf(1)),
			args: vec![Box::new(leaf(2)), Box::new(leaf(3))],
		});
		let (root, map) = unzonk(&tree, &mut || fresh(&counter));
		assert!(map.contains_key(&root));
		let back = zonk(Some(root), &map);
		assert_tree_eq(&tree, &back);
	}

	/// The round-trip law holds for a tree with an *interior* hole too: the
	/// hole's own position is simply absent from `map`, but everything
	/// above and beside it survives (spec §4.4's Law, §8's "Zonk
	/// round-trip" property — neither is scoped to complete trees only).
	#[test]
	fn zonk_of_unzonk_is_identity_for_a_tree_with_an_interior_hole() {
		let counter = Counter::new();
		let tree = HoleTree::Node(CoreShape::App {
			func: Box::new(leaf(1)),
			args: vec![Box::new(HoleTree::Hole)],
		});
		let (root, map) = unzonk(&tree, &mut || fresh(&counter));
		assert!(map.contains_key(&root), "the root is a known node, so it must have a map entry");
		let back = zonk(Some(root), &map);
		assert_tree_eq(&tree, &back);
	}

	#[test]
	fn zonk_is_total_for_missing_ids() {
		let map = HashMap::new();
		let missing = NodeId::from_raw(42);
		let tree = zonk(Some(missing), &map);
		assert!(matches!(tree, HoleTree::Hole));
	}

	fn assert_tree_eq(a: &HoleTree, b: &HoleTree) {
		match (a, b) {
			(HoleTree::Hole, HoleTree::Hole) => {}
			(HoleTree::Node(sa), HoleTree::Node(sb)) => match (sa, sb) {
				(CoreShape::Lit(la), CoreShape::Lit(lb)) => assert_eq!(format!("{la:?}"), format!("{lb:?}")),
				(CoreShape::App { func: fa, args: aa }, CoreShape::App { func: fb, args: ab }) => {
					assert_tree_eq(fa, fb);
					assert_eq!(aa.len(), ab.len());
					for (x, y) in aa.iter().zip(ab.iter()) {
						assert_tree_eq(x, y);
					}
				}
				_ => panic!("shape mismatch"),
			},
			_ => panic!("hole/node mismatch"),
		}
	}
}
