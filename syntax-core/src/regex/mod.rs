//! The regex-to-DFA compiler: AST (C1 parse target), NFA (C2), DFA builder
//! and minimizer (C3), and the longest-match runtime (C4), plus the
//! Unicode-category sub-builder (C10) they share.

pub mod ast;
pub mod dfa;
pub mod nfa;
pub mod parser;
pub mod reader;
pub mod unicode_class;

pub use ast::Ast;
pub use dfa::{match_longest, Dfa, MatchResult};
pub use nfa::Nfa;
pub use parser::parse;
pub use reader::{SliceReader, TextReader};

/// Parse and compile a pattern directly to a single-rule DFA (accept action
/// `1`). Convenience wrapper; the tokenizer instead compiles each rule to
/// an `Nfa` and unions them before a single minimization pass (spec §4.5).
pub fn compile(pattern: &str) -> Result<Dfa, crate::error::RegexError> {
    let ast = parse(pattern)?;
    Ok(Dfa::compile(&ast))
}
