//! Recursive-descent parser for the regex dialect in spec §4.1/§6.1.
//!
//! ```text
//! regex   := alt
//! alt     := concat ("|" concat)*
//! concat  := postfix*
//! postfix := atom ("*" | "+" | "?")?
//! atom    := char | "(" regex ")" | charclass | "." | "\" escape
//!          | "^" | "$" | "\p{" name "}"
//! ```
//!
//! `concat` accepts zero or more `postfix`es (rather than the strict
//! `postfix+` spelled in spec §4.1) so that an empty alternative branch like
//! `a|` parses as `Union(Char('a'), Empty)` instead of failing — the empty
//! branch is semantically just `Ast::Empty`, and rejecting it would make
//! `a?` (spec's own desugaring target) awkward to hand-write directly as
//! `(a|)`.

use std::{collections::BTreeSet, sync::Arc};

use syntax_unicode::RangeTable;

use crate::{error::RegexError, regex::ast::Ast};

pub fn parse(pattern: &str) -> Result<Ast, RegexError> {
    if pattern.is_empty() {
        return Err(RegexError::EmptyRegex);
    }
    let mut p = Parser {
        input: pattern.as_bytes(),
        pos: 0,
    };
    let ast = p.parse_alt()?;
    if p.pos != p.input.len() {
        // Only reachable if a stray ')' remains, since every other
        // terminator is consumed by its opener.
        return Err(RegexError::UnbalancedParen { at: p.pos });
    }
    Ok(ast)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_alt(&mut self) -> Result<Ast, RegexError> {
        let mut alts = vec![self.parse_concat()?];
        while self.eat(b'|') {
            alts.push(self.parse_concat()?);
        }
        Ok(Ast::union_all(alts))
    }

    fn parse_concat(&mut self) -> Result<Ast, RegexError> {
        let mut atoms = Vec::new();
        while let Some(b) = self.peek() {
            if b == b'|' || b == b')' {
                break;
            }
            atoms.push(self.parse_postfix()?);
        }
        Ok(Ast::concat_all(atoms))
    }

    fn parse_postfix(&mut self) -> Result<Ast, RegexError> {
        let atom = self.parse_atom()?;
        match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                Ok(Ast::star(atom))
            }
            Some(b'+') => {
                self.pos += 1;
                Ok(Ast::plus(atom))
            }
            Some(b'?') => {
                self.pos += 1;
                Ok(Ast::optional(atom))
            }
            _ => Ok(atom),
        }
    }

    fn parse_atom(&mut self) -> Result<Ast, RegexError> {
        let at = self.pos;
        match self.bump() {
            None => Err(RegexError::UnbalancedParen { at }),
            Some(b'(') => {
                let inner = self.parse_alt()?;
                if !self.eat(b')') {
                    return Err(RegexError::UnbalancedParen { at });
                }
                Ok(Ast::Paren(Box::new(inner)))
            }
            Some(b')') => Err(RegexError::UnbalancedParen { at }),
            Some(b'*') | Some(b'+') | Some(b'?') => {
                Err(RegexError::DanglingQuantifier { at })
            }
            Some(b'.') => Ok(Ast::any_byte()),
            Some(b'^') => Ok(Ast::StartOfText),
            Some(b'$') => Ok(Ast::EndOfText),
            Some(b'[') => self.parse_char_class(at),
            Some(b'\\') => self.parse_escape_atom(at),
            Some(b) if b.is_ascii() => Ok(Ast::Char(b)),
            Some(lead) => self.parse_utf8_literal(at, lead),
        }
    }

    /// A non-ASCII literal byte in the pattern source starts a UTF-8
    /// sequence; match it byte-for-byte rather than rejecting it (spec
    /// §6.1 only *requires* ASCII-printable literals, it doesn't forbid
    /// embedding other Unicode text directly in the pattern).
    fn parse_utf8_literal(&mut self, at: usize, lead: u8) -> Result<Ast, RegexError> {
        let len = utf8_len(lead).ok_or(RegexError::InvalidEscape {
            at,
            ch: lead as char,
        })?;
        let mut bytes = vec![lead];
        for _ in 1..len {
            match self.bump() {
                Some(b) => bytes.push(b),
                None => return Err(RegexError::UnbalancedParen { at }),
            }
        }
        Ok(Ast::concat_all(bytes.into_iter().map(Ast::Char).collect()))
    }

    fn parse_escape_atom(&mut self, at: usize) -> Result<Ast, RegexError> {
        match self.peek() {
            Some(b'p') => {
                self.pos += 1;
                self.parse_unicode_category(at)
            }
            _ => {
                let byte = self.parse_escape_byte(at)?;
                Ok(Ast::Char(byte))
            }
        }
    }

    fn parse_unicode_category(&mut self, at: usize) -> Result<Ast, RegexError> {
        if !self.eat(b'{') {
            return Err(RegexError::InvalidEscape { at, ch: 'p' });
        }
        let name_start = self.pos;
        while self.peek().is_some_and(|b| b != b'}') {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(RegexError::UnterminatedCharClass { at });
        }
        let name = std::str::from_utf8(&self.input[name_start..self.pos])
            .expect("pattern is valid UTF-8 and category names are ASCII")
            .to_string();
        self.pos += 1; // consume '}'
        let table: RangeTable =
            syntax_unicode::lookup(&name).map_err(|_| RegexError::UnsupportedUnicodeCategory {
                at,
                name: name.clone(),
            })?;
        Ok(Ast::UnicodeCategory(Arc::new(table)))
    }

    /// Escapes recognized outside of character classes; `\p{...}` is
    /// handled separately by [`Self::parse_escape_atom`] before this is
    /// reached.
    fn parse_escape_byte(&mut self, at: usize) -> Result<u8, RegexError> {
        let b = self.bump().ok_or(RegexError::InvalidEscape { at, ch: '\\' })?;
        match b {
            b'n' => Ok(b'\n'),
            b't' => Ok(b'\t'),
            b'f' => Ok(0x0c),
            b'r' => Ok(b'\r'),
            b'\\' => Ok(b'\\'),
            b'|' => Ok(b'|'),
            b'?' => Ok(b'?'),
            b'[' => Ok(b'['),
            b']' => Ok(b']'),
            b'.' => Ok(b'.'),
            b'^' => Ok(b'^'),
            b'$' => Ok(b'$'),
            b'*' => Ok(b'*'),
            b'+' => Ok(b'+'),
            b'(' => Ok(b'('),
            b')' => Ok(b')'),
            b'"' => Ok(b'"'),
            other => Err(RegexError::InvalidEscape {
                at,
                ch: other as char,
            }),
        }
    }

    fn parse_char_class(&mut self, at: usize) -> Result<Ast, RegexError> {
        let negated = self.eat(b'^');
        let mut chars = BTreeSet::new();
        let mut saw_any = false;
        loop {
            match self.peek() {
                None => return Err(RegexError::UnterminatedCharClass { at }),
                Some(b']') if saw_any || !chars.is_empty() => {
                    self.pos += 1;
                    break;
                }
                Some(b']') => {
                    // `]` as the very first member is a literal, not the
                    // closer, in most regex dialects; spec is silent, so we
                    // instead treat it strictly: an empty class is invalid.
                    return Err(RegexError::UnterminatedCharClass { at });
                }
                Some(_) => {
                    saw_any = true;
                    let lo = self.parse_class_byte(at)?;
                    if self.peek() == Some(b'-')
                        && self.input.get(self.pos + 1).copied() != Some(b']')
                        && self.pos + 1 < self.input.len()
                    {
                        self.pos += 1; // consume '-'
                        let hi = self.parse_class_byte(at)?;
                        if lo > hi {
                            return Err(RegexError::UnterminatedCharClass { at });
                        }
                        for b in lo..=hi {
                            chars.insert(b);
                        }
                    } else {
                        chars.insert(lo);
                    }
                }
            }
        }
        if chars.is_empty() {
            return Err(RegexError::UnterminatedCharClass { at });
        }
        Ok(Ast::char_class(chars, negated))
    }

    fn parse_class_byte(&mut self, at: usize) -> Result<u8, RegexError> {
        match self.bump() {
            Some(b'\\') => self.parse_escape_byte(at),
            Some(b) => Ok(b),
            None => Err(RegexError::UnterminatedCharClass { at }),
        }
    }
}

pub(crate) fn utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7f => Some(1),
        0xc0..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf7 => Some(4),
        _ => None,
    }
}
