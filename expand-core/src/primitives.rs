//! The built-in special forms: `quote`, `lambda`, and `let-syntax`.
//! Registering one of these in the root binding table and
//! expansion environment is the only way a fresh [`ExpanderState`] knows
//! any syntax at all — application is not a primitive, it is the engine's
//! dispatch fallback (`engine::ExpanderState::dispatch_application`).

use std::rc::Rc;

use crate::binding::{EValue, PrimMacroFn, SyntacticCategory};
use crate::context::Symbol;
use crate::engine::{must_be_cons, must_be_ident, must_be_vec, ExpanderState};
use crate::error::ExpansionErr;
use crate::evaluator::Evaluator;
use crate::graph::{CoreShape, NodeId};
use crate::scope::{Phase, Scope, ScopeSet};
use crate::syntax::Syntax;

/// Registers `quote`, `lambda`, and `let-syntax` at a fresh top scope.
/// Returns that scope, so a caller can fold it into the ambient scope set
/// of whatever syntax it reads in.
pub fn install_primitives<E: Evaluator>(state: &mut ExpanderState<E>) -> Scope {
	let top = state.fresh_scope();
	bind_prim(state, "quote", top, quote_prim);
	bind_prim(state, "lambda", top, lambda_prim);
	bind_prim(state, "let-syntax", top, let_syntax_prim);
	top
}

fn bind_prim<E: Evaluator>(
	state: &mut ExpanderState<E>,
	name: &str,
	scope: Scope,
	f: fn(&mut ExpanderState<E>, NodeId, Phase, SyntacticCategory, &Syntax) -> Result<(), ExpansionErr>,
) {
	let binding = state.fresh_binding();
	state.add_binding(Symbol::intern(name), ScopeSet::single(scope), binding);
	let f: PrimMacroFn<E> = Rc::new(f);
	state.env_extend(Phase::RUNTIME, binding, EValue::PrimMacro(f));
}

//====================================================================================================================//
// quote
//====================================================================================================================//

fn quote_prim<E: Evaluator>(
	state: &mut ExpanderState<E>,
	target: NodeId,
	phase: Phase,
	category: SyntacticCategory,
	input: &Syntax,
) -> Result<(), ExpansionErr> {
	let (_head, tail) = must_be_cons(input)?;
	if tail.len() != 1 {
		return Err(ExpansionErr::NotRightLength {
			expected: 1,
			loc: input.loc().clone(),
		});
	}
	state.realize(target, phase, category, CoreShape::Quote(tail[0].clone()));
	Ok(())
}

//====================================================================================================================//
// lambda (zero or more parameters)
//====================================================================================================================//

fn lambda_prim<E: Evaluator>(
	state: &mut ExpanderState<E>,
	target: NodeId,
	phase: Phase,
	category: SyntacticCategory,
	input: &Syntax,
) -> Result<(), ExpansionErr> {
	let (_head, tail) = must_be_cons(input)?;
	if tail.len() != 2 {
		return Err(ExpansionErr::NotRightLength {
			expected: 2,
			loc: input.loc().clone(),
		});
	}
	// `[x ...]`: a vector of however many parameters it turns out to hold.
	// `must_be_vec` still does the shape check (must genuinely be a `Vec`,
	// not e.g. a `List`) — we just ask for exactly as many elements as the
	// candidate has, rather than a fixed arity.
	let params = must_be_vec(&tail[0], tail[0].children().len())?;

	let scope = state.fresh_scope();
	let mut bindings = Vec::with_capacity(params.len());
	for param in params {
		let param_text = must_be_ident(param)?;
		let binding = state.fresh_binding();
		let param_scopes = param.scopes().insert(scope);
		state.add_binding(param_text, param_scopes, binding);
		state.env_extend(Phase::RUNTIME, binding, EValue::VarMacro(CoreShape::Ref(binding)));
		bindings.push(binding);
	}

	let body = tail[1].insert_scope(scope);
	state.realize(target, phase, category, CoreShape::Lambda { params: bindings, body });
	Ok(())
}

//====================================================================================================================//
// let-syntax
//====================================================================================================================//

fn let_syntax_prim<E: Evaluator>(
	state: &mut ExpanderState<E>,
	target: NodeId,
	phase: Phase,
	category: SyntacticCategory,
	input: &Syntax,
) -> Result<(), ExpansionErr> {
	let (_head, tail) = must_be_cons(input)?;
	if tail.len() != 2 {
		return Err(ExpansionErr::NotRightLength {
			expected: 2,
			loc: input.loc().clone(),
		});
	}
	let body_stx = &tail[1];
	let pair = must_be_vec(&tail[0], 2)?;
	let name = must_be_ident(&pair[0])?;
	let rhs = pair[1].clone();

	// The right-hand side is compile-time code: it runs one phase up from
	// the body it is defining a macro for.
	let rhs_phase = phase.shift(1);
	let rhs_target = state.queue(rhs, rhs_phase, SyntacticCategory::Expression);
	state.drive_until_complete(rhs_target)?;
	let tree = state.graph().zonk_node(rhs_target);
	let macro_value = state.evaluator_mut().eval_transformer(&tree);

	let scope = state.fresh_scope();
	let binding = state.fresh_binding();
	let name_scopes = pair[0].scopes().insert(scope);
	state.add_binding(name, name_scopes, binding);
	state.env_extend(phase, binding, EValue::UserMacro(SyntacticCategory::Expression, macro_value));

	let body = body_stx.insert_scope(scope);
	state.reexpand(target, body, phase, category);
	Ok(())
}
