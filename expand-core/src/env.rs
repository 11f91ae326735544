//! The expansion environment: a phase-indexed mapping from [`Binding`] to
//! [`EValue`] (spec §4.3).

use std::collections::HashMap;

use crate::binding::{Binding, EValue};
use crate::evaluator::Evaluator;
use crate::scope::Phase;

pub struct ExpansionEnv<E: Evaluator> {
	phases: HashMap<Phase, HashMap<Binding, EValue<E>>>,
}

impl<E: Evaluator> Default for ExpansionEnv<E> {
	fn default() -> Self {
		ExpansionEnv { phases: HashMap::new() }
	}
}

impl<E: Evaluator> ExpansionEnv<E> {
	pub fn new() -> ExpansionEnv<E> {
		ExpansionEnv::default()
	}

	/// Built-in special forms are registered once, at phase 0, by
	/// `primitives::install_primitives` — but a macro transformer's body
	/// runs one phase up from the macro it defines (spec §4.5's `let-syntax`
	/// primitive), and still needs `quote`/`lambda`/application to be
	/// written at all. `PrimMacro` entries are therefore phase-polymorphic:
	/// visible at whichever phase is asked, falling back to phase 0 only for
	/// that one `EValue` kind. `VarMacro`/`UserMacro` bindings stay strictly
	/// phase-local — only the kernel-level forms cross phases for free.
	pub fn lookup(&self, phase: Phase, binding: Binding) -> Option<&EValue<E>> {
		if let Some(value) = self.phases.get(&phase).and_then(|table| table.get(&binding)) {
			return Some(value);
		}
		if phase != Phase::RUNTIME {
			if let Some(value @ EValue::PrimMacro(_)) = self.phases.get(&Phase::RUNTIME).and_then(|table| table.get(&binding)) {
				return Some(value);
			}
		}
		None
	}

	pub fn extend(&mut self, phase: Phase, binding: Binding, value: EValue<E>) {
		self.phases.entry(phase).or_default().insert(binding, value);
	}

	/// Renames every phase `p` to `p + by`, leaving the bindings and values
	/// themselves untouched. Used when a term defined at one phase is
	/// evaluated as if it were at another (spec §8, "Phase shift
	/// additivity": `shift i (shift j env) == shift (i + j) env`).
	pub fn shift(&self, by: i64) -> ExpansionEnv<E> {
		let mut shifted = ExpansionEnv::new();
		for (phase, bindings) in &self.phases {
			shifted.phases.insert(phase.shift(by), bindings.clone());
		}
		shifted
	}
}
