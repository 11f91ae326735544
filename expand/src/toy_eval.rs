//! A toy [`Evaluator`] standing in for a real core-language interpreter.
//! It does not execute the core language at all: a transformer compiled
//! from `(quote <template>)` always expands to `<template>`, ignoring its
//! call site, and a transformer can be told to block on a signal before
//! producing its result. Good enough to drive `expand-core`'s scheduler
//! end to end; nowhere near a real macro-expander's evaluator.

use expand_core::{Evaluator, HoleTree, MacroOutcome, Signal, Syntax};

#[derive(Clone)]
pub enum ToyMacro {
	/// Always expands to `template`, regardless of its input.
	Template(Syntax),
	/// Blocks on `signal`; once resumed, expands to `then`.
	BlockOnSignal(Signal, Syntax),
}

#[derive(Default)]
pub struct ToyEvaluator;

impl Evaluator for ToyEvaluator {
	type MacroValue = ToyMacro;
	/// What to hand back once the blocked call is resumed.
	type Continuation = Syntax;

	fn invoke(&mut self, value: &ToyMacro, _input: Syntax) -> MacroOutcome<Self> {
		match value {
			ToyMacro::Template(template) => MacroOutcome::Done(template.clone()),
			ToyMacro::BlockOnSignal(signal, then) => MacroOutcome::Blocked(*signal, then.clone()),
		}
	}

	fn resume(&mut self, continuation: Syntax, _signal: Signal) -> MacroOutcome<Self> {
		MacroOutcome::Done(continuation)
	}

	/// Recognizes exactly one shape of compile-time code: `(quote datum)`,
	/// whose transformer is the constant-returning macro `Template(datum)`.
	/// Anything else compiles to a macro that expands to itself quoted,
	/// since this harness has no real way to run arbitrary core terms.
	fn eval_transformer(&mut self, term: &HoleTree) -> ToyMacro {
		match term {
			HoleTree::Node(expand_core::CoreShape::Quote(datum)) => ToyMacro::Template(datum.clone()),
			_ => ToyMacro::Template(Syntax::from_reader(
				expand_core::Payload::Bool(false),
				expand_core::SrcLoc::default(),
			)),
		}
	}
}
