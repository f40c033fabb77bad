//! Parser combinators (spec §3 "Parse state (C8)", §4.8).
//!
//! `ParseFn` is modeled as a boxed callable (Design Notes §9: "interface-
//! dispatch parser-combinator functions ... as a boxed callable type"),
//! wrapped in an `Rc` so [`Parser`] itself is cheap to clone — every
//! combinator below clones its operands into a closure that may be called
//! many times as the incremental cache (C9) replays a language's grammar
//! over different spans of the document.

use std::rc::Rc;

use crate::parse::rune_iter::RuneIter;
use crate::token::TokenRole;

/// One token a parse produced, with `offset` relative to the start of the
/// parse that produced it (spec §3 "Computation node (C9)").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComputedToken {
    pub offset: usize,
    pub length: usize,
    pub role: TokenRole,
}

/// The result of a successful parse (spec §4.8: `{num_consumed,
/// computed_tokens, next_state}`).
#[derive(Clone, Debug)]
pub struct ParseOutcome<S> {
    pub num_consumed: usize,
    pub tokens: Vec<ComputedToken>,
    pub next_state: S,
}

/// `None` means the parse failed.
pub type ParseResult<S> = Option<ParseOutcome<S>>;

type RunFn<'a, S> = dyn Fn(RuneIter<'a>, S) -> ParseResult<S> + 'a;

/// `ParseFn :: (RuneIter, State) → Result` (spec §4.8), as a cheaply
/// cloneable value so combinators can capture their operands by value.
#[derive(Clone)]
pub struct Parser<'a, S> {
    f: Rc<RunFn<'a, S>>,
}

impl<'a, S: Clone + 'a> Parser<'a, S> {
    pub fn new(f: impl Fn(RuneIter<'a>, S) -> ParseResult<S> + 'a) -> Parser<'a, S> {
        Parser { f: Rc::new(f) }
    }

    pub fn run(&self, iter: RuneIter<'a>, state: S) -> ParseResult<S> {
        (self.f)(iter, state)
    }

    fn advance_copy(iter: &RuneIter<'a>, runes: usize) -> RuneIter<'a> {
        let mut rest = iter.clone();
        RuneIter::skip(&mut rest, runes);
        rest
    }

    /// `self.then(g)`: both must succeed; `g`'s tokens are offset-shifted
    /// by `self`'s consumed length.
    pub fn then(&self, g: Parser<'a, S>) -> Parser<'a, S> {
        let f = self.clone();
        Parser::new(move |iter: RuneIter<'a>, state: S| {
            let first = f.run(iter.clone(), state)?;
            let rest = Self::advance_copy(&iter, first.num_consumed);
            let second = g.run(rest, first.next_state.clone())?;
            Some(join(first, second))
        })
    }

    /// `self.then_maybe(g)`: succeeds whenever `self` does; `g`'s result
    /// is folded in only if `g` also succeeds.
    pub fn then_maybe(&self, g: Parser<'a, S>) -> Parser<'a, S> {
        let f = self.clone();
        Parser::new(move |iter: RuneIter<'a>, state: S| {
            let first = f.run(iter.clone(), state)?;
            let rest = Self::advance_copy(&iter, first.num_consumed);
            match g.run(rest, first.next_state.clone()) {
                Some(second) => Some(join(first, second)),
                None => Some(first),
            }
        })
    }

    /// `self.then_not(g)`: succeeds only if `g` fails right after `self`.
    pub fn then_not(&self, g: Parser<'a, S>) -> Parser<'a, S> {
        let f = self.clone();
        Parser::new(move |iter: RuneIter<'a>, state: S| {
            let first = f.run(iter.clone(), state)?;
            let rest = Self::advance_copy(&iter, first.num_consumed);
            match g.run(rest, first.next_state.clone()) {
                Some(_) => None,
                None => Some(first),
            }
        })
    }

    /// `self.or(g)`: try `self`; on failure, try `g` at the original
    /// position (the clone `self` consumed is simply dropped).
    pub fn or(&self, g: Parser<'a, S>) -> Parser<'a, S> {
        let f = self.clone();
        Parser::new(move |iter: RuneIter<'a>, state: S| {
            f.run(iter.clone(), state.clone()).or_else(|| g.run(iter, state))
        })
    }

    /// `self.maybe_before(g)`: `self?` followed by required `g` — `self`
    /// failing is not fatal, `g` failing is.
    pub fn maybe_before(&self, g: Parser<'a, S>) -> Parser<'a, S> {
        let f = self.clone();
        Parser::new(move |iter: RuneIter<'a>, state: S| match f.run(iter.clone(), state.clone()) {
            Some(first) => {
                let rest = Self::advance_copy(&iter, first.num_consumed);
                let second = g.run(rest, first.next_state.clone())?;
                Some(join(first, second))
            }
            None => g.run(iter, state),
        })
    }

    /// Post-process a successful outcome.
    pub fn map(&self, h: impl Fn(ParseOutcome<S>) -> ParseOutcome<S> + 'a) -> Parser<'a, S> {
        let f = self.clone();
        Parser::new(move |iter: RuneIter<'a>, state: S| f.run(iter, state).map(&h))
    }

    /// Post-process a successful outcome with access to the exact input
    /// text it consumed.
    pub fn map_with_input(
        &self,
        h: impl Fn(&'a str, ParseOutcome<S>) -> ParseOutcome<S> + 'a,
    ) -> Parser<'a, S> {
        let f = self.clone();
        Parser::new(move |iter: RuneIter<'a>, state: S| {
            let outcome = f.run(iter.clone(), state)?;
            let input = iter.peek_str(outcome.num_consumed);
            Some(h(input, outcome))
        })
    }
}

fn join<S>(first: ParseOutcome<S>, second: ParseOutcome<S>) -> ParseOutcome<S> {
    let mut tokens = first.tokens;
    tokens.extend(second.tokens.into_iter().map(|t| ComputedToken {
        offset: t.offset + first.num_consumed,
        ..t
    }));
    ParseOutcome {
        num_consumed: first.num_consumed + second.num_consumed,
        tokens,
        next_state: second.next_state,
    }
}

/// Succeeds consuming nothing, emitting nothing, and leaving `state`
/// unchanged. Identity element for `then` (`f.then(empty()) == f`).
pub fn empty<'a, S: Clone + 'a>() -> Parser<'a, S> {
    Parser::new(|_iter: RuneIter<'a>, state: S| {
        Some(ParseOutcome {
            num_consumed: 0,
            tokens: Vec::new(),
            next_state: state,
        })
    })
}

/// Matches `text` exactly, case-sensitively, consuming no tokens.
pub fn literal<'a, S: Clone + 'a>(text: &'a str) -> Parser<'a, S> {
    Parser::new(move |mut iter: RuneIter<'a>, state: S| {
        for expected in text.chars() {
            match iter.next() {
                Some(c) if c == expected => {}
                _ => return None,
            }
        }
        Some(ParseOutcome {
            num_consumed: text.chars().count(),
            tokens: Vec::new(),
            next_state: state,
        })
    })
}

/// Matches a single alphanumeric rune.
pub fn letter_or_digit<'a, S: Clone + 'a>() -> Parser<'a, S> {
    Parser::new(|mut iter: RuneIter<'a>, state: S| match iter.next() {
        Some(c) if c.is_alphanumeric() => Some(ParseOutcome {
            num_consumed: 1,
            tokens: Vec::new(),
            next_state: state,
        }),
        _ => None,
    })
}

/// `self` succeeds producing exactly one token of `role` spanning what it
/// consumed.
impl<'a, S: Clone + 'a> Parser<'a, S> {
    pub fn as_token(&self, role: TokenRole) -> Parser<'a, S> {
        let f = self.clone();
        Parser::new(move |iter: RuneIter<'a>, state: S| {
            let outcome = f.run(iter, state)?;
            Some(ParseOutcome {
                tokens: vec![ComputedToken {
                    offset: 0,
                    length: outcome.num_consumed,
                    role,
                }],
                ..outcome
            })
        })
    }
}
