//! The binding table and the resolver built on top of it (spec §3, §4.2),
//! plus the taxonomy of things a [`Binding`] can mean ([`EValue`]).

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use crate::context::Symbol;
use crate::engine::ExpanderState;
use crate::error::ExpansionErr;
use crate::evaluator::Evaluator;
use crate::graph::CoreFragment;
use crate::scope::ScopeSet;
use crate::syntax::Syntax;

//====================================================================================================================//
// Binding
//====================================================================================================================//

/// An opaque token naming "a thing". Globally unique within one expansion.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Binding(u64);

impl Binding {
	pub(crate) fn from_raw(id: u64) -> Binding {
		Binding(id)
	}
}

impl Debug for Binding {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "b#{}", self.0)
	}
}

//====================================================================================================================//
// SyntacticCategory
//====================================================================================================================//

/// Where a [`EValue::UserMacro`] is permitted to be used.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SyntacticCategory {
	Module,
	Declaration,
	Expression,
}

//====================================================================================================================//
// EValue
//====================================================================================================================//

/// A function implementing a built-in special form. Given the engine (for
/// allocating scopes/bindings/node ids and running the shape destructors),
/// the node id its result belongs at, the phase/category it was invoked
/// under, and the input syntax, it is responsible for resolving `target` —
/// typically by calling `ExpanderState::realize` with a [`CoreFragment`], or
/// by re-queuing a rewritten form at the same `target` (as `let-syntax` does
/// with its body).
pub type PrimMacroFn<E> = Rc<
	dyn Fn(
		&mut ExpanderState<E>,
		crate::graph::NodeId,
		crate::scope::Phase,
		SyntacticCategory,
		&Syntax,
	) -> Result<(), ExpansionErr>,
>;

/// What a [`Binding`] means, for the purposes of expansion.
pub enum EValue<E: Evaluator> {
	/// A built-in special form.
	PrimMacro(PrimMacroFn<E>),
	/// The binding is a bound variable; this is its reference shape.
	VarMacro(CoreFragment),
	/// A user-defined macro, restricted to `category`.
	UserMacro(SyntacticCategory, E::MacroValue),
}

// Derived `Clone` would require `E: Clone`, which is both unnecessary (only
// the macro value needs to be) and usually false for a real evaluator.
impl<E: Evaluator> Clone for EValue<E> {
	fn clone(&self) -> Self {
		match self {
			EValue::PrimMacro(f) => EValue::PrimMacro(f.clone()),
			EValue::VarMacro(fragment) => EValue::VarMacro(fragment.clone()),
			EValue::UserMacro(category, value) => EValue::UserMacro(*category, value.clone()),
		}
	}
}

impl<E: Evaluator> Debug for EValue<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			EValue::PrimMacro(_) => write!(f, "PrimMacro(..)"),
			EValue::VarMacro(_) => write!(f, "VarMacro(..)"),
			EValue::UserMacro(category, _) => write!(f, "UserMacro({category:?}, ..)"),
		}
	}
}

//====================================================================================================================//
// BindingTable
//====================================================================================================================//

/// Mapping from identifier text to an ordered list of `(scope set, binding)`
/// pairs. Only ever grows during one expansion (spec §3).
#[derive(Default)]
pub struct BindingTable {
	entries: HashMap<Symbol, Vec<(ScopeSet, Binding)>>,
}

impl BindingTable {
	pub fn new() -> BindingTable {
		BindingTable::default()
	}

	/// Prepends `(scopes, binding)` to the list for `text`.
	pub fn add_binding(&mut self, text: Symbol, scopes: ScopeSet, binding: Binding) {
		let list = self.entries.entry(text).or_default();
		list.insert(0, (scopes, binding));
	}

	/// All `(scope set, binding)` pairs recorded for `text` whose scope set
	/// is a subset of `scopes` — the candidates the resolver picks among.
	pub fn all_matching_bindings(&self, text: Symbol, scopes: &ScopeSet) -> Vec<(ScopeSet, Binding)> {
		self.entries
			.get(&text)
			.into_iter()
			.flatten()
			.filter(|(candidate, _)| candidate.is_subset_of(scopes))
			.cloned()
			.collect()
	}

	/// Resolves an identifier syntax object to a binding (spec §4.2).
	pub fn resolve(&self, stx: &Syntax) -> Result<Binding, ExpansionErr> {
		let text = stx.identifier_text().ok_or_else(|| ExpansionErr::NotIdentifier { loc: stx.loc().clone() })?;
		let candidates = self.all_matching_bindings(text, stx.scopes());
		let Some(best_size) = candidates.iter().map(|(scopes, _)| scopes.size()).max() else {
			return Err(ExpansionErr::Unknown {
				text,
				loc: stx.loc().clone(),
			});
		};
		let mut best = candidates.iter().filter(|(scopes, _)| scopes.size() == best_size);
		let winner = best.next().expect("max-size candidate must exist");
		if best.next().is_some() {
			return Err(ExpansionErr::Ambiguous {
				text,
				loc: stx.loc().clone(),
			});
		}
		Ok(winner.1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scope::Scope;

	fn id(text: &str, scopes: ScopeSet) -> Syntax {
		use crate::syntax::{Payload, SrcLoc};
		Syntax::new(Payload::Id(Symbol::intern(text)), scopes, SrcLoc::default())
	}

	#[test]
	fn resolver_picks_the_largest_subset() {
		let mut table = BindingTable::new();
		let s1 = Scope::from_raw(1);
		let s2 = Scope::from_raw(2);
		let b_outer = Binding::from_raw(1);
		let b_inner = Binding::from_raw(2);
		table.add_binding(Symbol::intern("x"), ScopeSet::empty().insert(s1), b_outer);
		table.add_binding(Symbol::intern("x"), ScopeSet::empty().insert(s1).insert(s2), b_inner);

		let stx = id("x", ScopeSet::empty().insert(s1).insert(s2));
		assert_eq!(table.resolve(&stx).unwrap(), b_inner);
	}

	#[test]
	fn resolver_fails_on_no_candidates() {
		let table = BindingTable::new();
		let stx = id("y", ScopeSet::empty());
		assert!(matches!(table.resolve(&stx), Err(ExpansionErr::Unknown { .. })));
	}

	#[test]
	fn resolver_fails_on_tied_candidates() {
		let mut table = BindingTable::new();
		let s1 = Scope::from_raw(1);
		let s2 = Scope::from_raw(2);
		table.add_binding(Symbol::intern("x"), ScopeSet::empty().insert(s1), Binding::from_raw(1));
		table.add_binding(Symbol::intern("x"), ScopeSet::empty().insert(s2), Binding::from_raw(2));

		let stx = id("x", ScopeSet::empty().insert(s1).insert(s2));
		assert!(matches!(table.resolve(&stx), Err(ExpansionErr::Ambiguous { .. })));
	}

	#[test]
	fn unrelated_bindings_do_not_affect_resolution() {
		let mut table = BindingTable::new();
		let s1 = Scope::from_raw(1);
		let b = Binding::from_raw(1);
		table.add_binding(Symbol::intern("x"), ScopeSet::empty().insert(s1), b);

		let stx = id("x", ScopeSet::empty().insert(s1));
		assert_eq!(table.resolve(&stx).unwrap(), b);

		table.add_binding(Symbol::intern("y"), ScopeSet::empty(), Binding::from_raw(2));
		assert_eq!(table.resolve(&stx).unwrap(), b);
	}
}
