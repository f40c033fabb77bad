//! Incremental syntax-highlighting core for a terminal text editor:
//! regex-to-DFA compiler, tokenizer, position-indexed token tree,
//! incremental retokenizer, and a parser-combinator layer with its own
//! incremental computation-tree cache.
//!
//! Two independent frontends sit on the same automata/tree machinery: the
//! rule-table [`tokenizer`] (regex-driven, for simple lexical
//! highlighting) and the hand-written [`parse`] combinators (for
//! languages whose structure a regular grammar can't express). Both
//! produce `Token`s; both support incremental reuse after an edit.

pub mod error;
pub mod menu;
pub mod parse;
pub mod regex;
pub mod retokenize;
pub mod token;
pub mod token_tree;
pub mod tokenizer;

pub use error::{RuleCompileError, ScanError};
pub use retokenize::{Edit, Retokenizer};
pub use token::{Token, TokenRole};
pub use token_tree::{Direction, TokenTree};
pub use tokenizer::{Rule, Tokenizer};
