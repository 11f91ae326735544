//! The harness the `expand` binary drives the engine with: a toy reader and
//! a toy evaluator, just concrete enough to exercise `expand-core` end to
//! end in `expand-core`'s own integration tests. Neither is a real reader
//! or a real core-language evaluator — see each module's doc comment.

pub mod reader;
pub mod toy_eval;
