/*!
Unicode range-table plumbing for [`relex`](https://docs.rs/syntax-core)'s
regex engine.

This crate answers exactly one question: given a named Unicode category
(`L`, `Nd`, `Lu`, `Lo`, `Other_ID_Start`, a POSIX class like `alpha`, …),
what code points does it contain, and what UTF-8 byte sequences encode
them? It does not vendor Unicode Character Database tables itself; it
reuses `regex-syntax`'s, the same data the wider regex ecosystem already
ships and keeps up to date.
*/

mod tables;
mod utf8;

pub use tables::{lookup, RangeTable, UnknownCategory};
pub use utf8::{byte_sequences, ByteSequence};
