//! Scopes and scope sets: the atoms (and sets of them) that tag every
//! identifier occurrence and drive binding resolution (spec §3, §4.1).

use std::fmt::{Debug, Formatter};

//====================================================================================================================//
// Scope
//====================================================================================================================//

/// An opaque token. Two scopes are equal iff they are the same allocation;
/// a fresh scope is never equal to any other scope.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Scope(u64);

impl Scope {
	pub(crate) fn from_raw(id: u64) -> Scope {
		Scope(id)
	}
}

impl Debug for Scope {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "s#{}", self.0)
	}
}

//====================================================================================================================//
// ScopeSet
//====================================================================================================================//

/// A finite, value-typed set of [`Scope`]s.
///
/// Backed by a sorted, deduplicated vector rather than a hash set: the
/// number of scopes on any one identifier is small, and keeping the vector
/// sorted gives cheap structural equality and a stable iteration order for
/// free — the same tradeoff the teacher makes for its small collections
/// (`NodeList`, `BindingList`'s `BTreeMap`) in favor of sorted/ordered
/// containers over hash sets.
#[derive(Clone, Default, Eq, PartialEq, Hash)]
pub struct ScopeSet(Vec<Scope>);

impl ScopeSet {
	pub fn empty() -> ScopeSet {
		ScopeSet(Vec::new())
	}

	pub fn single(scope: Scope) -> ScopeSet {
		ScopeSet(vec![scope])
	}

	pub fn size(&self) -> usize {
		self.0.len()
	}

	pub fn contains(&self, scope: Scope) -> bool {
		self.0.binary_search(&scope).is_ok()
	}

	pub fn insert(&self, scope: Scope) -> ScopeSet {
		match self.0.binary_search(&scope) {
			Ok(_) => self.clone(),
			Err(at) => {
				let mut scopes = self.0.clone();
				scopes.insert(at, scope);
				ScopeSet(scopes)
			}
		}
	}

	pub fn remove(&self, scope: Scope) -> ScopeSet {
		match self.0.binary_search(&scope) {
			Ok(at) => {
				let mut scopes = self.0.clone();
				scopes.remove(at);
				ScopeSet(scopes)
			}
			Err(_) => self.clone(),
		}
	}

	/// Toggles membership of `scope`: insert if absent, remove if present.
	/// Used by the hygiene rule to add a fresh scope before a macro call and
	/// cancel it again afterwards (spec §4.5 "Hygiene rule").
	pub fn flip(&self, scope: Scope) -> ScopeSet {
		if self.contains(scope) {
			self.remove(scope)
		} else {
			self.insert(scope)
		}
	}

	pub fn union(&self, other: &ScopeSet) -> ScopeSet {
		let mut scopes = self.0.clone();
		for &scope in &other.0 {
			if scopes.binary_search(&scope).is_err() {
				scopes.push(scope);
			}
		}
		scopes.sort();
		ScopeSet(scopes)
	}

	pub fn intersection(&self, other: &ScopeSet) -> ScopeSet {
		let scopes = self.0.iter().copied().filter(|s| other.contains(*s)).collect();
		ScopeSet(scopes)
	}

	pub fn is_subset_of(&self, other: &ScopeSet) -> bool {
		self.0.iter().all(|s| other.contains(*s))
	}

	pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
		self.0.iter().copied()
	}
}

impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{{")?;
		for (n, scope) in self.0.iter().enumerate() {
			if n > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{scope:?}")?;
		}
		write!(f, "}}")
	}
}

//====================================================================================================================//
// Phase
//====================================================================================================================//

/// A phase level: 0 is runtime, `n + 1` is "the world `n` levels of macro
/// definitions above". Phases observed in practice are never negative, but
/// `shift` is defined over signed arithmetic so that future uses (e.g.
/// `for-template`-style phase reversal) never need a representation change.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Phase(i64);

impl Phase {
	pub const RUNTIME: Phase = Phase(0);

	pub fn new(level: i64) -> Phase {
		Phase(level)
	}

	pub fn level(&self) -> i64 {
		self.0
	}

	/// `shift i` adds `i` to this phase. Additive: `shift i (shift j x) ==
	/// shift (i + j) x` (spec §8, "Phase shift additivity").
	pub fn shift(&self, by: i64) -> Phase {
		Phase(self.0 + by)
	}
}

impl Debug for Phase {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "phase({})", self.0)
	}
}

//====================================================================================================================//
// Signal
//====================================================================================================================//

/// A rendez-vous token between a suspended expansion task and the evaluator.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Signal(u64);

impl Signal {
	pub fn new(value: u64) -> Signal {
		Signal(value)
	}

	pub fn value(&self) -> u64 {
		self.0
	}
}

impl Debug for Signal {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "signal({})", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn s(n: u64) -> Scope {
		Scope::from_raw(n)
	}

	#[test]
	fn empty_set_has_size_zero() {
		assert_eq!(ScopeSet::empty().size(), 0);
	}

	#[test]
	fn insert_is_idempotent_and_sorted() {
		let set = ScopeSet::empty().insert(s(3)).insert(s(1)).insert(s(2)).insert(s(1));
		assert_eq!(set.size(), 3);
		assert_eq!(set.iter().collect::<Vec<_>>(), vec![s(1), s(2), s(3)]);
	}

	#[test]
	fn flip_toggles_membership() {
		let set = ScopeSet::empty().insert(s(1));
		let flipped = set.flip(s(1));
		assert!(!flipped.contains(s(1)));
		let flipped_again = flipped.flip(s(1));
		assert_eq!(flipped_again, set);
	}

	#[test]
	fn is_subset_of_respects_emptiness() {
		let a = ScopeSet::empty().insert(s(1));
		let b = ScopeSet::empty().insert(s(1)).insert(s(2));
		assert!(a.is_subset_of(&b));
		assert!(!b.is_subset_of(&a));
		assert!(ScopeSet::empty().is_subset_of(&a));
	}

	#[test]
	fn distinct_sets_can_share_size() {
		let a = ScopeSet::empty().insert(s(1));
		let b = ScopeSet::empty().insert(s(2));
		assert_eq!(a.size(), b.size());
		assert_ne!(a, b);
	}

	#[test]
	fn union_and_intersection() {
		let a = ScopeSet::empty().insert(s(1)).insert(s(2));
		let b = ScopeSet::empty().insert(s(2)).insert(s(3));
		assert_eq!(a.union(&b).size(), 3);
		assert_eq!(a.intersection(&b), ScopeSet::empty().insert(s(2)));
	}

	#[test]
	fn phase_shift_is_additive() {
		let p = Phase::new(1);
		assert_eq!(p.shift(2).shift(3), p.shift(5));
	}
}
