//! The parser-combinator frontend (spec §3 "Parse state (C8)", §4.8–§4.9):
//! an alternative to the regex-driven [`crate::tokenizer`] for languages
//! whose structure needs hand-written recursive descent, with its own
//! incremental parse cache (the computation tree, C9).

pub mod comp_tree;
pub mod combinators;
pub mod rune_iter;

pub use combinators::{empty, letter_or_digit, literal, ComputedToken, ParseOutcome, ParseResult, Parser};
pub use comp_tree::{parse_incremental, CompTree};
pub use rune_iter::RuneIter;
