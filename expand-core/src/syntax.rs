//! Syntax objects: the immutable tree the reader produces and the expander
//! consumes (spec §3).

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::context::Symbol;
use crate::scope::ScopeSet;

//====================================================================================================================//
// SrcLoc
//====================================================================================================================//

/// File name plus a start/end line/column range. Carried for diagnostics
/// only — it never participates in the equality of syntax or of bindings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SrcLoc {
	file: Option<Arc<str>>,
	start_line: u32,
	start_column: u32,
	end_line: u32,
	end_column: u32,
}

impl SrcLoc {
	pub fn new(file: impl AsRef<str>, start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> SrcLoc {
		SrcLoc {
			file: Some(Arc::from(file.as_ref())),
			start_line,
			start_column,
			end_line,
			end_column,
		}
	}

	pub fn is_known(&self) -> bool {
		self.file.is_some()
	}
}

impl Debug for SrcLoc {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(file) = &self.file {
			write!(
				f,
				"{file}:{}:{}-{}:{}",
				self.start_line, self.start_column, self.end_line, self.end_column
			)
		} else {
			write!(f, "<unknown>")
		}
	}
}

//====================================================================================================================//
// Payload
//====================================================================================================================//

/// The content carried by a [`Syntax`] node, independent of its scope set
/// and source location.
#[derive(Clone)]
pub enum Payload {
	Id(Symbol),
	Sig(u64),
	Bool(bool),
	Str(Arc<str>),
	List(Vec<Syntax>),
	Vec(Vec<Syntax>),
}

//====================================================================================================================//
// Syntax
//====================================================================================================================//

/// An immutable (scope set, source location, payload) triple.
///
/// Syntax objects are cheap to clone: the payload's children are shared via
/// `Vec` cloning of `Syntax` values, which is itself cheap because the only
/// owned data under a leaf (`Symbol`, `Arc<str>`) is reference-counted or a
/// `Copy` scalar.
#[derive(Clone)]
pub struct Syntax {
	scopes: ScopeSet,
	loc: SrcLoc,
	payload: Payload,
}

impl Syntax {
	pub fn new(payload: Payload, scopes: ScopeSet, loc: SrcLoc) -> Syntax {
		Syntax { scopes, loc, payload }
	}

	/// Builds a syntax object with the reader's initial (empty) scope set.
	pub fn from_reader(payload: Payload, loc: SrcLoc) -> Syntax {
		Syntax::new(payload, ScopeSet::empty(), loc)
	}

	pub fn payload(&self) -> &Payload {
		&self.payload
	}

	pub fn scopes(&self) -> &ScopeSet {
		&self.scopes
	}

	pub fn loc(&self) -> &SrcLoc {
		&self.loc
	}

	pub fn is_identifier(&self) -> bool {
		matches!(self.payload, Payload::Id(_))
	}

	/// The identifier text, if this is an `Id` node.
	pub fn identifier_text(&self) -> Option<Symbol> {
		match &self.payload {
			Payload::Id(text) => Some(*text),
			_ => None,
		}
	}

	pub fn children(&self) -> &[Syntax] {
		match &self.payload {
			Payload::List(children) | Payload::Vec(children) => children,
			_ => &[],
		}
	}

	/// Applies a scope-set transformation to this node and, recursively,
	/// to every child. Used both to establish a binding's scope and as the
	/// building block of the hygiene `flip` (spec §3, §4.5).
	pub fn adjust_scopes(&self, f: &impl Fn(&ScopeSet) -> ScopeSet) -> Syntax {
		let scopes = f(&self.scopes);
		let payload = match &self.payload {
			Payload::List(children) => Payload::List(children.iter().map(|c| c.adjust_scopes(f)).collect()),
			Payload::Vec(children) => Payload::Vec(children.iter().map(|c| c.adjust_scopes(f)).collect()),
			other => other.clone(),
		};
		Syntax {
			scopes,
			loc: self.loc.clone(),
			payload,
		}
	}

	/// Toggles `scope` on every node of the tree. This is the structural
	/// primitive the hygienic macro-introduction rule is built from.
	pub fn flip_scope(&self, scope: crate::scope::Scope) -> Syntax {
		self.adjust_scopes(&|scopes| scopes.flip(scope))
	}

	/// Inserts `scope` into every node of the tree, without touching
	/// anything else. Used by binding forms (e.g. `lambda`) to mark their
	/// parameters and body as belonging to a fresh local scope.
	pub fn insert_scope(&self, scope: crate::scope::Scope) -> Syntax {
		self.adjust_scopes(&|scopes| scopes.insert(scope))
	}
}

impl Debug for Syntax {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match &self.payload {
			Payload::Id(text) => write!(f, "{text}{:?}", self.scopes),
			Payload::Sig(n) => write!(f, "{n}"),
			Payload::Bool(b) => write!(f, "{b}"),
			Payload::Str(s) => write!(f, "{s:?}"),
			Payload::List(children) => {
				write!(f, "(")?;
				for (n, child) in children.iter().enumerate() {
					if n > 0 {
						write!(f, " ")?;
					}
					write!(f, "{child:?}")?;
				}
				write!(f, ")")
			}
			Payload::Vec(children) => {
				write!(f, "[")?;
				for (n, child) in children.iter().enumerate() {
					if n > 0 {
						write!(f, " ")?;
					}
					write!(f, "{child:?}")?;
				}
				write!(f, "]")
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scope::Scope;

	fn id(text: &str) -> Syntax {
		Syntax::from_reader(Payload::Id(Symbol::intern(text)), SrcLoc::default())
	}

	#[test]
	fn adjust_scopes_is_structural() {
		let tree = Syntax::from_reader(Payload::List(vec![id("a"), id("b")]), SrcLoc::default());
		let scope = Scope::from_raw(1);
		let adjusted = tree.insert_scope(scope);
		for child in adjusted.children() {
			assert!(child.scopes().contains(scope));
		}
		assert!(adjusted.scopes().contains(scope));
	}

	#[test]
	fn flip_twice_cancels() {
		let tree = Syntax::from_reader(Payload::List(vec![id("a")]), SrcLoc::default());
		let scope = Scope::from_raw(7);
		let flipped_twice = tree.flip_scope(scope).flip_scope(scope);
		assert_eq!(flipped_twice.children()[0].scopes(), tree.children()[0].scopes());
	}
}
