use std::env;

use expand_core::{primitives, ExpanderState};

use expand::reader;
use expand::toy_eval::ToyEvaluator;

fn main() {
	tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

	let mut done = false;
	let mut files = Vec::new();
	for arg in env::args().skip(1) {
		done = done
			|| match arg.as_str() {
				"--version" | "-v" => {
					println!("\nexpand 0.1.0 - expander harness\n");
					true
				}
				"--help" | "-h" => {
					print_usage();
					true
				}
				_ => {
					files.push(arg);
					false
				}
			}
	}

	if done {
		return;
	}

	if files.len() != 1 {
		print_usage();
		if !files.is_empty() {
			eprintln!("[error] specify a single file\n");
		} else {
			eprintln!("[error] no arguments given\n");
		}
		std::process::exit(1);
	}

	let file = &files[0];
	match std::fs::read_to_string(file) {
		Ok(content) => execute(file, &content),
		Err(msg) => {
			eprintln!("\n[error] reading {file}: {msg}\n");
			std::process::exit(1);
		}
	}
}

fn print_usage() {
	println!("\nUSAGE:\n\n  expand {{FILE}}\n");
	println!("Expands every top-level form in FILE and prints its core syntax.\n");
}

fn execute(name: &str, input: &str) {
	let forms = match reader::read_all(name, input) {
		Ok(forms) => forms,
		Err(e) => {
			eprintln!("\n[read error] {name}:{e}\n");
			std::process::exit(2);
		}
	};

	let mut state = ExpanderState::new(ToyEvaluator::default());
	let top = primitives::install_primitives(&mut state);
	let forms = forms.into_iter().map(|stx| stx.insert_scope(top)).collect::<Vec<_>>();

	let targets = state.expand_module_body(forms);
	if let Err(e) = state.run() {
		eprintln!("\n[expand error] {name}: {e}\n");
		std::process::exit(2);
	}

	for target in targets {
		if state.graph().is_complete_from(target) {
			let tree = state.graph().zonk_node(target);
			println!("{tree:?}");
		} else {
			eprintln!("\n[expand error] {name}: form at node {target:?} did not fully expand\n");
			std::process::exit(2);
		}
	}
}
