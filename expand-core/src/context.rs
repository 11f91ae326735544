//! Process-wide facilities shared by every expansion: interned identifier
//! text and the monotonic counters opaque ids are carved from.
//!
//! Symbol interning is process-global on purpose — identifier text is
//! immutable and shared freely across expansions, the same way the teacher's
//! `Str::intern` store is a single global table (see `core/strings.rs` in
//! the example this crate is modeled on). Scopes, bindings, node ids, and
//! task ids are *not* global: each belongs to exactly one expansion, so their
//! counters live on [`crate::engine::ExpanderState`] instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

//====================================================================================================================//
// Symbol
//====================================================================================================================//

/// An interned identifier string.
///
/// Two `Symbol`s compare equal iff their underlying text is equal; the
/// comparison itself is a cheap integer compare once interned.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Symbol(usize);

impl Symbol {
	pub fn intern<S: AsRef<str>>(text: S) -> Symbol {
		let store = Self::store();
		let mut store = store.lock().unwrap();
		store.add(text.as_ref())
	}

	pub fn as_str(&self) -> Arc<str> {
		let store = Self::store();
		let store = store.lock().unwrap();
		store.get(*self)
	}

	fn store() -> &'static Mutex<SymbolStore> {
		static STORE: OnceCell<Mutex<SymbolStore>> = OnceCell::new();
		STORE.get_or_init(|| Mutex::new(SymbolStore::default()))
	}
}

impl<T: AsRef<str>> From<T> for Symbol {
	fn from(value: T) -> Self {
		Symbol::intern(value)
	}
}

impl std::fmt::Debug for Symbol {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}", self.as_str())
	}
}

impl std::fmt::Display for Symbol {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

#[derive(Default)]
struct SymbolStore {
	hash: HashMap<Arc<str>, Symbol>,
	entries: Vec<Arc<str>>,
}

impl SymbolStore {
	fn add(&mut self, text: &str) -> Symbol {
		if let Some(id) = self.hash.get(text) {
			*id
		} else {
			let id = Symbol(self.entries.len());
			let text: Arc<str> = Arc::from(text);
			self.entries.push(text.clone());
			self.hash.insert(text, id);
			id
		}
	}

	fn get(&self, id: Symbol) -> Arc<str> {
		self.entries[id.0].clone()
	}
}

//====================================================================================================================//
// Counter
//====================================================================================================================//

/// A monotonic source of small opaque ids, scoped to a single owner.
///
/// Unlike the teacher's process-global `Context::id()` (which uses an
/// `AtomicUsize` because it is shared across threads), a [`Counter`] belongs
/// to exactly one [`crate::engine::ExpanderState`], which owns it exclusively
/// for the lifetime of one expansion (see spec §5) — a plain [`Cell`] is the
/// correct tool here, not atomics.
#[derive(Default)]
pub struct Counter(std::cell::Cell<u64>);

impl Counter {
	pub fn new() -> Self {
		Self(std::cell::Cell::new(0))
	}

	/// Returns a fresh, never-before-returned value.
	pub fn next(&self) -> u64 {
		let value = self.0.get();
		self.0.set(value + 1);
		value
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn interning_roundtrips_text() {
		let a = Symbol::intern("lambda");
		let b = Symbol::intern("lambda");
		let c = Symbol::intern("let-syntax");
		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(a.as_str().as_ref(), "lambda");
	}

	#[test]
	fn counter_never_repeats() {
		let counter = Counter::new();
		let values: Vec<_> = (0..16).map(|_| counter.next()).collect();
		let mut sorted = values.clone();
		sorted.sort();
		sorted.dedup();
		assert_eq!(values, sorted);
	}
}
