//! The expander's error taxonomy (spec §7). Every variant aborts the
//! expansion unit it occurred in — there is no local retry; the caller of
//! `expandExpression` and friends decides what to do with the error.

use std::fmt::{Debug, Display, Formatter};

use crate::context::Symbol;
use crate::engine::TaskId;
use crate::syntax::SrcLoc;

#[derive(Clone)]
pub enum ExpansionErr {
	/// The resolver found more than one maximum-size candidate binding.
	Ambiguous { text: Symbol, loc: SrcLoc },
	/// The resolver found no candidate binding.
	Unknown { text: Symbol, loc: SrcLoc },
	/// A shape check expected an identifier.
	NotIdentifier { loc: SrcLoc },
	/// A shape check expected an empty list.
	NotEmpty { loc: SrcLoc },
	/// A shape check expected a non-empty list.
	NotCons { loc: SrcLoc },
	/// A shape check expected a vector of a specific length.
	NotRightLength { expected: usize, loc: SrcLoc },
	/// A user macro's category disagrees with its usage context.
	WrongCategory {
		expected: crate::binding::SyntacticCategory,
		got: crate::binding::SyntacticCategory,
		loc: SrcLoc,
	},
	/// Every task is blocked and no pending external event can deliver a
	/// signal: the expansion is stuck.
	StuckExpansion { representative: TaskId },
}

impl ExpansionErr {
	fn loc(&self) -> Option<&SrcLoc> {
		match self {
			ExpansionErr::Ambiguous { loc, .. }
			| ExpansionErr::Unknown { loc, .. }
			| ExpansionErr::NotIdentifier { loc }
			| ExpansionErr::NotEmpty { loc }
			| ExpansionErr::NotCons { loc }
			| ExpansionErr::NotRightLength { loc, .. }
			| ExpansionErr::WrongCategory { loc, .. } => Some(loc),
			ExpansionErr::StuckExpansion { .. } => None,
		}
	}
}

impl Display for ExpansionErr {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(loc) = self.loc() {
			if loc.is_known() {
				write!(f, "at {loc:?}: ")?;
			}
		}
		match self {
			ExpansionErr::Ambiguous { text, .. } => write!(f, "ambiguous reference to `{text}`"),
			ExpansionErr::Unknown { text, .. } => write!(f, "`{text}` is not bound"),
			ExpansionErr::NotIdentifier { .. } => write!(f, "expected an identifier"),
			ExpansionErr::NotEmpty { .. } => write!(f, "expected an empty list"),
			ExpansionErr::NotCons { .. } => write!(f, "expected a non-empty list"),
			ExpansionErr::NotRightLength { expected, .. } => write!(f, "expected a vector of length {expected}"),
			ExpansionErr::WrongCategory { expected, got, .. } => {
				write!(f, "expected a {expected:?} macro, found a {got:?} macro")
			}
			ExpansionErr::StuckExpansion { representative } => {
				write!(f, "stuck expansion: task {representative:?} is blocked with no way to make progress")
			}
		}
	}
}

impl Debug for ExpansionErr {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{self}")
	}
}

impl std::error::Error for ExpansionErr {}
