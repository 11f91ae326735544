//! The expander: the subsystem that turns raw [`syntax::Syntax`] objects into
//! a partial core-term graph, resolving identifiers via scope sets, running
//! user-defined macros through an external [`evaluator::Evaluator`], and
//! scheduling the incremental, interruptible expansion tasks that macros may
//! suspend by waiting on a [`Signal`].
//!
//! The reader (the S-expression parser) and the core-language evaluator used
//! to run macro bodies are not part of this crate: they are external
//! collaborators, reached only through the interfaces in [`evaluator`]. File
//! I/O, module loading across files, and pretty-printing are out of scope.

pub mod binding;
pub mod context;
pub mod engine;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod primitives;
pub mod scope;
pub mod syntax;

pub use binding::{Binding, BindingTable, EValue, SyntacticCategory};
pub use context::Symbol;
pub use engine::{ExpanderState, TaskId};
pub use env::ExpansionEnv;
pub use error::ExpansionErr;
pub use evaluator::{Evaluator, MacroOutcome};
pub use graph::{CoreShape, HoleTree, Lit, NodeId, PartialCoreGraph};
pub use scope::{Phase, Scope, ScopeSet, Signal};
pub use syntax::{Payload, SrcLoc, Syntax};

/// Convenience alias: `Result` defaulting its error type to [`ExpansionErr`].
pub type Result<T> = std::result::Result<T, ExpansionErr>;
