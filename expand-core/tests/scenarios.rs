//! The end-to-end scenarios from the expander's scheduling contract,
//! driven through the toy reader and toy evaluator the `expand` crate
//! ships for exactly this purpose. Each test mirrors one of the
//! documented scheduler scenarios; see the module docs in `expand-core`
//! for the underlying engine these exercise.

use expand::reader;
use expand::toy_eval::{ToyEvaluator, ToyMacro};
use expand_core::{primitives, CoreShape, ExpanderState, ExpansionErr, Lit, Payload, Scope, ScopeSet, Signal, Symbol, Syntax};

fn read_one(src: &str) -> Syntax {
	let mut forms = reader::read_all("<test>", src).unwrap();
	assert_eq!(forms.len(), 1, "expected exactly one top-level form in {src:?}");
	forms.remove(0)
}

fn fresh_state() -> (ExpanderState<ToyEvaluator>, Scope) {
	let mut state = ExpanderState::new(ToyEvaluator::default());
	let top = primitives::install_primitives(&mut state);
	(state, top)
}

#[test]
fn literal_signal_expands_with_no_blocked_tasks() {
	let (mut state, top) = fresh_state();
	let stx = read_one("42").insert_scope(top);
	let target = state.expand_expression(stx);
	state.run().expect("42 should expand with no blocked tasks");
	assert!(matches!(state.graph().get(target), Some(CoreShape::Lit(Lit::Sig(42)))));
}

#[test]
fn lambda_binds_its_parameter_in_a_fresh_scope() {
	let (mut state, top) = fresh_state();
	let stx = read_one("(lambda [x] x)").insert_scope(top);
	let target = state.expand_expression(stx);
	state.run().expect("(lambda [x] x) should expand cleanly");
	match state.graph().get(target) {
		Some(CoreShape::Lambda { params, body }) => {
			assert_eq!(params.len(), 1);
			assert!(matches!(state.graph().get(*body), Some(CoreShape::Ref(b)) if b == &params[0]));
		}
		other => panic!("expected a Lambda, got {other:?}"),
	}
}

#[test]
fn lambda_binds_every_parameter_in_a_multi_arg_vector() {
	let (mut state, top) = fresh_state();
	let stx = read_one("(lambda [x y z] y)").insert_scope(top);
	let target = state.expand_expression(stx);
	state.run().expect("(lambda [x y z] y) should expand cleanly");
	match state.graph().get(target) {
		Some(CoreShape::Lambda { params, body }) => {
			assert_eq!(params.len(), 3);
			// `body` is `y`, the middle parameter.
			assert!(matches!(state.graph().get(*body), Some(CoreShape::Ref(b)) if b == &params[1]));
		}
		other => panic!("expected a Lambda, got {other:?}"),
	}
}

#[test]
fn lambda_with_zero_parameters_is_allowed() {
	let (mut state, top) = fresh_state();
	let stx = read_one("(lambda [] 1)").insert_scope(top);
	let target = state.expand_expression(stx);
	state.run().expect("(lambda [] 1) should expand cleanly");
	match state.graph().get(target) {
		Some(CoreShape::Lambda { params, body }) => {
			assert!(params.is_empty());
			assert!(matches!(state.graph().get(*body), Some(CoreShape::Lit(Lit::Sig(1)))));
		}
		other => panic!("expected a Lambda, got {other:?}"),
	}
}

/// A `let-syntax`-bound macro whose transformer is `(quote (lambda [y] y))`
/// always expands to that template, regardless of its use site — so using
/// it should yield the same shape as expanding `(lambda [y] y)` directly.
/// The scope the engine adds around the macro's expansion (the hygiene
/// flip) must not introduce any spurious shadowing of `y`.
#[test]
fn let_syntax_macro_expansion_matches_expanding_its_template_directly() {
	let (mut direct, top) = fresh_state();
	let direct_target = direct.expand_expression(read_one("(lambda [y] y)").insert_scope(top));
	direct.run().unwrap();

	let (mut via_macro, top) = fresh_state();
	let stx = read_one("(let-syntax [m (quote (lambda [y] y))] (m))").insert_scope(top);
	let macro_target = via_macro.expand_expression(stx);
	via_macro.run().expect("let-syntax use should expand cleanly");

	for (state, target) in [(&direct, direct_target), (&via_macro, macro_target)] {
		match state.graph().get(target) {
			Some(CoreShape::Lambda { params, body }) => {
				assert_eq!(params.len(), 1);
				assert!(matches!(state.graph().get(*body), Some(CoreShape::Ref(b)) if b == &params[0]));
			}
			other => panic!("expected a Lambda, got {other:?}"),
		}
	}
}

/// A user macro that blocks on a signal leaves the expansion `Stuck` until
/// the signal is delivered; once it is, expansion completes with whatever
/// core the macro's continuation produced.
#[test]
fn macro_blocked_on_a_signal_resumes_once_it_is_sent() {
	let (mut state, top) = fresh_state();

	let scope = state.fresh_scope();
	let binding = state.fresh_binding();
	state.add_binding(Symbol::intern("m"), ScopeSet::single(top).insert(scope), binding);
	let signal = Signal::new(7);
	let then = read_one("1");
	state.env_extend(
		expand_core::Phase::RUNTIME,
		binding,
		expand_core::EValue::UserMacro(expand_core::SyntacticCategory::Expression, ToyMacro::BlockOnSignal(signal, then)),
	);

	let m_id = Syntax::new(Payload::Id(Symbol::intern("m")), ScopeSet::single(top).insert(scope), Default::default());
	let call = Syntax::new(Payload::List(vec![m_id]), ScopeSet::single(top).insert(scope), Default::default());
	let target = state.expand_expression(call);

	assert!(matches!(state.run(), Err(ExpansionErr::StuckExpansion { .. })));

	state.send_signal(signal);
	state.run().expect("expansion should complete once the signal is delivered");
	assert!(matches!(state.graph().get(target), Some(CoreShape::Lit(Lit::Sig(1)))));
}

#[test]
fn unbound_head_fails_with_unknown() {
	let (mut state, top) = fresh_state();
	let stx = read_one("(foo)").insert_scope(top);
	state.expand_expression(stx);
	match state.run() {
		Err(ExpansionErr::Unknown { text, .. }) => assert_eq!(text.as_str().as_ref(), "foo"),
		other => panic!("expected Unknown(\"foo\"), got {other:?}"),
	}
}

/// Two bindings of `x`, at disjoint scopes `{s1}` and `{s2}`; an occurrence
/// whose own scope set is `{s1, s2}` has two candidates tied at the same
/// (maximum) size, so resolution is ambiguous rather than picking either.
#[test]
fn identifier_with_two_equally_specific_bindings_is_ambiguous() {
	let (mut state, _top) = fresh_state();
	let s1 = state.fresh_scope();
	let s2 = state.fresh_scope();
	let b1 = state.fresh_binding();
	let b2 = state.fresh_binding();
	state.add_binding(Symbol::intern("x"), ScopeSet::single(s1), b1);
	state.add_binding(Symbol::intern("x"), ScopeSet::single(s2), b2);

	let occurrence = Syntax::new(Payload::Id(Symbol::intern("x")), ScopeSet::single(s1).insert(s2), Default::default());
	state.expand_expression(occurrence);
	assert!(matches!(state.run(), Err(ExpansionErr::Ambiguous { .. })));
}
