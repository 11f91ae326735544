//! The expansion engine: a single-threaded cooperative scheduler over a
//! queue of tasks, each filling in one pending position of the partial core
//! graph (spec §4.5).
//!
//! Nothing here ever spawns an OS thread. "Concurrency" is entirely the
//! interleaving of `Ready` tasks in FIFO order and the bookkeeping needed to
//! wake a `Blocked` one once its signal has been delivered.

use std::fmt::{Debug, Formatter};

use tracing::{debug, trace};

use crate::binding::{Binding, BindingTable, EValue, SyntacticCategory};
use crate::context::Counter;
use crate::error::ExpansionErr;
use crate::evaluator::{Evaluator, MacroOutcome};
use crate::env::ExpansionEnv;
use crate::graph::{CoreFragment, CoreShape, Lit, NodeId, PartialCoreGraph, ResolvedShape};
use crate::scope::{Phase, Scope, ScopeSet, Signal};
use crate::syntax::{Payload, Syntax};

//====================================================================================================================//
// TaskId
//====================================================================================================================//

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TaskId(u64);

impl Debug for TaskId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "t#{}", self.0)
	}
}

//====================================================================================================================//
// Task
//====================================================================================================================//

enum TaskStatus<E: Evaluator> {
	Ready {
		stx: Syntax,
		target: NodeId,
		phase: Phase,
		category: SyntacticCategory,
	},
	Blocked {
		signal: Signal,
		continuation: E::Continuation,
		target: NodeId,
		phase: Phase,
		category: SyntacticCategory,
		flip: Scope,
	},
}

struct Task<E: Evaluator> {
	id: TaskId,
	status: TaskStatus<E>,
}

//====================================================================================================================//
// Shape destructors (spec §4.5.c)
//====================================================================================================================//

pub fn must_be_ident(stx: &Syntax) -> Result<crate::context::Symbol, ExpansionErr> {
	stx.identifier_text().ok_or_else(|| ExpansionErr::NotIdentifier { loc: stx.loc().clone() })
}

pub fn must_be_empty(stx: &Syntax) -> Result<(), ExpansionErr> {
	match stx.payload() {
		Payload::List(children) if children.is_empty() => Ok(()),
		_ => Err(ExpansionErr::NotEmpty { loc: stx.loc().clone() }),
	}
}

pub fn must_be_cons(stx: &Syntax) -> Result<(&Syntax, &[Syntax]), ExpansionErr> {
	match stx.payload() {
		Payload::List(children) if !children.is_empty() => Ok((&children[0], &children[1..])),
		_ => Err(ExpansionErr::NotCons { loc: stx.loc().clone() }),
	}
}

pub fn must_be_vec(stx: &Syntax, len: usize) -> Result<&[Syntax], ExpansionErr> {
	match stx.payload() {
		Payload::Vec(children) if children.len() == len => Ok(children),
		_ => Err(ExpansionErr::NotRightLength { expected: len, loc: stx.loc().clone() }),
	}
}

//====================================================================================================================//
// ExpanderState
//====================================================================================================================//

/// Everything one expansion owns: the id counters, the binding table and
/// environment, the live graph, the task queue, and the set of signals
/// that have been delivered so far. Not `Sync` — an expansion belongs to
/// exactly one thread for its entire lifetime (spec §5).
pub struct ExpanderState<E: Evaluator> {
	scopes: Counter,
	bindings: Counter,
	nodes: Counter,
	task_ids: Counter,
	table: BindingTable,
	env: ExpansionEnv<E>,
	graph: PartialCoreGraph,
	tasks: Vec<Task<E>>,
	received: std::collections::HashSet<Signal>,
	evaluator: E,
}

impl<E: Evaluator> ExpanderState<E> {
	pub fn new(evaluator: E) -> ExpanderState<E> {
		ExpanderState {
			scopes: Counter::new(),
			bindings: Counter::new(),
			nodes: Counter::new(),
			task_ids: Counter::new(),
			table: BindingTable::new(),
			env: ExpansionEnv::new(),
			graph: PartialCoreGraph::new(),
			tasks: Vec::new(),
			received: std::collections::HashSet::new(),
			evaluator,
		}
	}

	pub fn fresh_scope(&mut self) -> Scope {
		Scope::from_raw(self.scopes.next())
	}

	pub fn fresh_binding(&mut self) -> Binding {
		Binding::from_raw(self.bindings.next())
	}

	pub fn fresh_node_id(&mut self) -> NodeId {
		NodeId::from_raw(self.nodes.next())
	}

	fn fresh_task_id(&mut self) -> TaskId {
		TaskId(self.task_ids.next())
	}

	pub fn add_binding(&mut self, text: crate::context::Symbol, scopes: ScopeSet, binding: Binding) {
		self.table.add_binding(text, scopes, binding);
	}

	pub fn all_matching_bindings(&self, text: crate::context::Symbol, scopes: &ScopeSet) -> Vec<(ScopeSet, Binding)> {
		self.table.all_matching_bindings(text, scopes)
	}

	pub fn resolve(&self, stx: &Syntax) -> Result<Binding, ExpansionErr> {
		self.table.resolve(stx)
	}

	pub fn env_extend(&mut self, phase: Phase, binding: Binding, value: EValue<E>) {
		self.env.extend(phase, binding, value);
	}

	pub fn graph(&self) -> &PartialCoreGraph {
		&self.graph
	}

	pub fn evaluator_mut(&mut self) -> &mut E {
		&mut self.evaluator
	}

	//------------------------------------------------------------------------------------------------------------//
	// Entry points (spec §4.5, "External interface")
	//------------------------------------------------------------------------------------------------------------//

	/// Queues `stx` for expansion as an expression, at the runtime phase.
	/// Does not run the scheduler; call [`ExpanderState::run`] to drive it.
	pub fn expand_expression(&mut self, stx: Syntax) -> NodeId {
		self.queue(stx, Phase::RUNTIME, SyntacticCategory::Expression)
	}

	pub fn expand_declaration(&mut self, stx: Syntax) -> NodeId {
		self.queue(stx, Phase::RUNTIME, SyntacticCategory::Declaration)
	}

	pub fn expand_module_body(&mut self, forms: Vec<Syntax>) -> Vec<NodeId> {
		forms.into_iter().map(|stx| self.queue(stx, Phase::RUNTIME, SyntacticCategory::Module)).collect()
	}

	/// Queues `stx` at an arbitrary phase/category without running the
	/// scheduler. Used by primitives (e.g. `let-syntax`) that need to expand
	/// a sub-term at a phase other than the one they were invoked at.
	pub(crate) fn queue(&mut self, stx: Syntax, phase: Phase, category: SyntacticCategory) -> NodeId {
		let target = self.fresh_node_id();
		let id = self.fresh_task_id();
		trace!(?target, ?phase, ?category, "queue");
		self.tasks.push(Task {
			id,
			status: TaskStatus::Ready { stx, target, phase, category },
		});
		target
	}

	/// Records that `signal` has been delivered by the outside world. A task
	/// blocked on it becomes resumable on the next [`ExpanderState::run`].
	pub fn send_signal(&mut self, signal: Signal) {
		debug!(?signal, "signal delivered");
		self.received.insert(signal);
	}

	/// Drives the scheduler until every queued task has completed, or
	/// returns [`ExpansionErr::StuckExpansion`] if no further progress is
	/// possible with the signals delivered so far. Safe to call again after
	/// [`ExpanderState::send_signal`] to resume from where it left off.
	pub fn run(&mut self) -> Result<(), ExpansionErr> {
		self.run_until(|state| state.tasks.is_empty())
	}

	/// Like [`ExpanderState::run`], but stops as soon as `target`'s subtree
	/// is fully resolved rather than waiting for the whole task queue to
	/// drain. Used to synchronously expand a `let-syntax` right-hand side
	/// from inside a primitive macro.
	pub(crate) fn drive_until_complete(&mut self, target: NodeId) -> Result<(), ExpansionErr> {
		self.run_until(|state| state.graph.is_complete_from(target))
	}

	fn run_until(&mut self, done: impl Fn(&Self) -> bool) -> Result<(), ExpansionErr> {
		loop {
			if done(self) {
				return Ok(());
			}
			if let Some(index) = self.tasks.iter().position(|t| matches!(t.status, TaskStatus::Ready { .. })) {
				let task = self.tasks.remove(index);
				self.step_ready(task)?;
				continue;
			}
			if let Some(index) = self
				.tasks
				.iter()
				.position(|t| matches!(&t.status, TaskStatus::Blocked { signal, .. } if self.received.contains(signal)))
			{
				let task = self.tasks.remove(index);
				self.step_blocked(task);
				continue;
			}
			if self.tasks.is_empty() {
				return Ok(());
			}
			let representative = self.tasks[0].id;
			debug!(?representative, "stuck: every remaining task is blocked");
			return Err(ExpansionErr::StuckExpansion { representative });
		}
	}

	//------------------------------------------------------------------------------------------------------------//
	// Scheduler steps
	//------------------------------------------------------------------------------------------------------------//

	fn step_blocked(&mut self, task: Task<E>) {
		let TaskStatus::Blocked { signal, continuation, target, phase, category, flip } = task.status else {
			unreachable!("step_blocked called with a Ready task");
		};
		debug!(?target, ?signal, "resuming blocked task");
		let outcome = self.evaluator.resume(continuation, signal);
		self.handle_macro_outcome(target, phase, category, flip, outcome);
	}

	fn step_ready(&mut self, task: Task<E>) -> Result<(), ExpansionErr> {
		let TaskStatus::Ready { stx, target, phase, category } = task.status else {
			unreachable!("step_ready called with a Blocked task");
		};

		if let Some(text) = stx.identifier_text() {
			return self.dispatch_identifier(text, stx, target, phase, category);
		}

		match stx.payload() {
			Payload::Sig(n) => self.realize(target, phase, category, CoreShape::Lit(Lit::Sig(*n))),
			Payload::Bool(b) => self.realize(target, phase, category, CoreShape::Lit(Lit::Bool(*b))),
			Payload::Str(s) => self.realize(target, phase, category, CoreShape::Lit(Lit::Str(s.clone()))),
			Payload::List(children) if children.is_empty() => Err(ExpansionErr::NotCons { loc: stx.loc().clone() }),
			Payload::List(_) => self.dispatch_list(stx, target, phase, category),
			Payload::Vec(_) => Err(ExpansionErr::NotCons { loc: stx.loc().clone() }),
			Payload::Id(_) => unreachable!("identifiers are handled above"),
		}
	}

	fn dispatch_identifier(
		&mut self,
		_text: crate::context::Symbol,
		stx: Syntax,
		target: NodeId,
		phase: Phase,
		category: SyntacticCategory,
	) -> Result<(), ExpansionErr> {
		let binding = self.table.resolve(&stx)?;
		match self.env.lookup(phase, binding) {
			Some(EValue::VarMacro(fragment)) => {
				let fragment = fragment.clone();
				self.realize(target, phase, category, fragment);
				Ok(())
			}
			Some(EValue::PrimMacro(prim)) => {
				let prim = prim.clone();
				prim(self, target, phase, category, &stx)
			}
			Some(EValue::UserMacro(required, value)) if *required == category => {
				let value = value.clone();
				self.dispatch_user_macro(target, phase, category, value, stx);
				Ok(())
			}
			Some(EValue::UserMacro(required, _)) => Err(ExpansionErr::WrongCategory {
				expected: *required,
				got: category,
				loc: stx.loc().clone(),
			}),
			None => Err(ExpansionErr::Unknown {
				text: stx.identifier_text().expect("already checked"),
				loc: stx.loc().clone(),
			}),
		}
	}

	fn dispatch_list(&mut self, stx: Syntax, target: NodeId, phase: Phase, category: SyntacticCategory) -> Result<(), ExpansionErr> {
		let (head, _tail) = must_be_cons(&stx)?;
		if let Some(text) = head.identifier_text() {
			if let Ok(binding) = self.table.resolve(head) {
				match self.env.lookup(phase, binding) {
					Some(EValue::PrimMacro(prim)) => {
						let prim = prim.clone();
						return prim(self, target, phase, category, &stx);
					}
					Some(EValue::UserMacro(required, value)) if *required == category => {
						let value = value.clone();
						self.dispatch_user_macro(target, phase, category, value, stx);
						return Ok(());
					}
					Some(EValue::UserMacro(required, _)) => {
						return Err(ExpansionErr::WrongCategory {
							expected: *required,
							got: category,
							loc: stx.loc().clone(),
						});
					}
					Some(EValue::VarMacro(_)) | None => {
						// Falls through to application below: a variable
						// (or an identifier bound at a different phase)
						// applied to arguments.
						let _ = text;
					}
				}
			}
		}
		self.dispatch_application(stx, target, phase, category)
	}

	/// The fallback when a list's head does not name a macro: expand it as
	/// `App { func, args }`, each position re-entering the scheduler as an
	/// expression.
	fn dispatch_application(&mut self, stx: Syntax, target: NodeId, phase: Phase, category: SyntacticCategory) -> Result<(), ExpansionErr> {
		let (head, tail) = must_be_cons(&stx)?;
		let fragment = CoreShape::App {
			func: head.clone(),
			args: tail.to_vec(),
		};
		self.realize(target, phase, category, fragment);
		Ok(())
	}

	fn dispatch_user_macro(&mut self, target: NodeId, phase: Phase, category: SyntacticCategory, value: E::MacroValue, input: Syntax) {
		let flip = self.fresh_scope();
		debug!(?target, ?flip, "hygiene flip before macro call");
		let flipped = input.flip_scope(flip);
		let outcome = self.evaluator.invoke(&value, flipped);
		self.handle_macro_outcome(target, phase, category, flip, outcome);
	}

	fn handle_macro_outcome(&mut self, target: NodeId, phase: Phase, category: SyntacticCategory, flip: Scope, outcome: MacroOutcome<E>) {
		match outcome {
			MacroOutcome::Done(output) => {
				let output = output.flip_scope(flip);
				trace!(?target, ?flip, "hygiene flip cancelled, re-queuing output");
				let id = self.fresh_task_id();
				self.tasks.push(Task {
					id,
					status: TaskStatus::Ready { stx: output, target, phase, category },
				});
			}
			MacroOutcome::Blocked(signal, continuation) => {
				debug!(?target, ?signal, "macro blocked on signal");
				let id = self.fresh_task_id();
				self.tasks.push(Task {
					id,
					status: TaskStatus::Blocked { signal, continuation, target, phase, category, flip },
				});
			}
		}
	}

	/// Re-queues `stx` to be expanded again, filling the *same* `target` once
	/// it settles. Used by primitives that rewrite to another surface form
	/// rather than directly to a core shape (`let-syntax`'s body), mirroring
	/// how a user macro's output is re-queued at its own target after the
	/// hygiene flip is cancelled.
	pub(crate) fn reexpand(&mut self, target: NodeId, stx: Syntax, phase: Phase, category: SyntacticCategory) {
		let id = self.fresh_task_id();
		self.tasks.push(Task {
			id,
			status: TaskStatus::Ready { stx, target, phase, category },
		});
	}

	/// Assigns `target` a [`ResolvedShape`] by allocating a fresh node id for
	/// every still-unexpanded child in `fragment` and queuing a `Ready` task
	/// for each. Category defaults to `Expression` for every child position:
	/// nothing in this spec's built-in forms nests a declaration or module
	/// position inside another term.
	pub(crate) fn realize(&mut self, target: NodeId, phase: Phase, category: SyntacticCategory, fragment: CoreFragment) {
		let _ = category;
		let resolved: ResolvedShape = fragment.map_children(|child| {
			let child_id = self.fresh_node_id();
			let id = self.fresh_task_id();
			self.tasks.push(Task {
				id,
				status: TaskStatus::Ready {
					stx: child,
					target: child_id,
					phase,
					category: SyntacticCategory::Expression,
				},
			});
			child_id
		});
		self.graph.insert(target, resolved);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::Symbol;
	use crate::syntax::SrcLoc;

	struct NoMacros;

	impl Evaluator for NoMacros {
		type MacroValue = ();
		type Continuation = ();

		fn invoke(&mut self, _value: &(), input: Syntax) -> MacroOutcome<Self> {
			MacroOutcome::Done(input)
		}

		fn resume(&mut self, _continuation: (), _signal: Signal) -> MacroOutcome<Self> {
			unreachable!()
		}

		fn eval_transformer(&mut self, _term: &crate::graph::HoleTree) {}
	}

	fn lit(n: u64) -> Syntax {
		Syntax::from_reader(Payload::Sig(n), SrcLoc::default())
	}

	fn id(text: &str) -> Syntax {
		Syntax::from_reader(Payload::Id(Symbol::intern(text)), SrcLoc::default())
	}

	#[test]
	fn literal_expands_to_itself() {
		let mut state = ExpanderState::new(NoMacros);
		let target = state.expand_expression(lit(42));
		state.run().unwrap();
		assert!(matches!(state.graph().get(target), Some(CoreShape::Lit(Lit::Sig(42)))));
	}

	#[test]
	fn unbound_identifier_is_an_error() {
		let mut state = ExpanderState::new(NoMacros);
		state.expand_expression(id("foo"));
		assert!(matches!(state.run(), Err(ExpansionErr::Unknown { .. })));
	}

	#[test]
	fn bound_variable_resolves_to_a_reference() {
		let mut state = ExpanderState::new(NoMacros);
		let binding = state.fresh_binding();
		state.add_binding(Symbol::intern("x"), ScopeSet::empty(), binding);
		state.env_extend(Phase::RUNTIME, binding, EValue::VarMacro(CoreShape::Ref(binding)));

		let target = state.expand_expression(id("x"));
		state.run().unwrap();
		assert!(matches!(state.graph().get(target), Some(CoreShape::Ref(b)) if *b == binding));
	}

	#[test]
	fn application_fallback_expands_func_and_args() {
		let mut state = ExpanderState::new(NoMacros);
		let binding = state.fresh_binding();
		state.add_binding(Symbol::intern("f"), ScopeSet::empty(), binding);
		state.env_extend(Phase::RUNTIME, binding, EValue::VarMacro(CoreShape::Ref(binding)));

		let call = Syntax::from_reader(Payload::List(vec![id("f"), lit(1), lit(2)]), SrcLoc::default());
		let target = state.expand_expression(call);
		state.run().unwrap();
		match state.graph().get(target) {
			Some(CoreShape::App { func, args }) => {
				assert!(matches!(state.graph().get(*func), Some(CoreShape::Ref(b)) if *b == binding));
				assert_eq!(args.len(), 2);
			}
			other => panic!("expected App, got {other:?}"),
		}
	}
}
