//! Regex abstract syntax tree (spec §3 "Regex AST (C1)", §4.1).

use std::{collections::BTreeSet, sync::Arc};

use syntax_unicode::RangeTable;

/// A parsed regex pattern.
///
/// `Concat` and `Union` are binary and left-associative, exactly as the
/// recursive-descent parser in [`super::parser`] produces them — a run of
/// `a b c` concatenations folds into `Concat(Concat(a, b), c)`, never a
/// variadic list.
#[derive(Clone, Debug, PartialEq)]
pub enum Ast {
    /// Matches the empty string.
    Empty,
    /// Matches exactly one literal byte.
    Char(u8),
    /// Matches one byte in (or, if `negated`, outside of) `chars`.
    CharClass { chars: BTreeSet<u8>, negated: bool },
    /// Matches the UTF-8 encoding of any code point in the category.
    UnicodeCategory(Arc<RangeTable>),
    /// Zero-width assertion: start of the (synthetic `START_OF_TEXT`-prefixed)
    /// input.
    StartOfText,
    /// Zero-width assertion: end of the (synthetic `END_OF_TEXT`-suffixed)
    /// input.
    EndOfText,
    Concat(Box<Ast>, Box<Ast>),
    Union(Box<Ast>, Box<Ast>),
    Star(Box<Ast>),
    /// A parenthesized sub-expression. Kept as a distinct node (rather than
    /// collapsed away) so diagnostics and `format_ast` can round-trip
    /// grouping, though it carries no additional semantics over its child.
    Paren(Box<Ast>),
}

impl Ast {
    pub fn char_class(chars: BTreeSet<u8>, negated: bool) -> Ast {
        debug_assert!(!chars.is_empty(), "CharClass must never be empty");
        Ast::CharClass { chars, negated }
    }

    pub fn concat(a: Ast, b: Ast) -> Ast {
        match (a, b) {
            (Ast::Empty, b) => b,
            (a, Ast::Empty) => a,
            (a, b) => Ast::Concat(Box::new(a), Box::new(b)),
        }
    }

    /// Fold a sequence of atoms into a left-associative `Concat` tree.
    pub fn concat_all(mut atoms: Vec<Ast>) -> Ast {
        if atoms.is_empty() {
            return Ast::Empty;
        }
        let mut acc = atoms.remove(0);
        for atom in atoms {
            acc = Ast::concat(acc, atom);
        }
        acc
    }

    pub fn union(a: Ast, b: Ast) -> Ast {
        Ast::Union(Box::new(a), Box::new(b))
    }

    /// Fold a sequence of alternatives into a left-associative `Union` tree.
    pub fn union_all(mut alts: Vec<Ast>) -> Ast {
        if alts.is_empty() {
            return Ast::Empty;
        }
        let mut acc = alts.remove(0);
        for alt in alts {
            acc = Ast::union(acc, alt);
        }
        acc
    }

    pub fn star(a: Ast) -> Ast {
        Ast::Star(Box::new(a))
    }

    /// `a+` desugars to `Concat(a, Star(a))` (spec §4.1).
    pub fn plus(a: Ast) -> Ast {
        Ast::concat(a.clone(), Ast::star(a))
    }

    /// `a?` desugars to `Union(Empty, a)` (spec §4.1).
    pub fn optional(a: Ast) -> Ast {
        Ast::union(Ast::Empty, a)
    }

    /// `.` is `CharClass { negated: true, chars: {} }` (spec §4.1): matches
    /// any byte.
    pub fn any_byte() -> Ast {
        Ast::CharClass {
            chars: BTreeSet::new(),
            negated: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_desugars_to_concat_star() {
        let a = Ast::Char(b'a');
        let plus = Ast::plus(a.clone());
        assert_eq!(
            plus,
            Ast::Concat(Box::new(a.clone()), Box::new(Ast::Star(Box::new(a))))
        );
    }

    #[test]
    fn optional_desugars_to_union_empty() {
        let a = Ast::Char(b'a');
        assert_eq!(
            Ast::optional(a.clone()),
            Ast::Union(Box::new(Ast::Empty), Box::new(a))
        );
    }

    #[test]
    fn concat_all_is_left_associative() {
        let tree = Ast::concat_all(vec![Ast::Char(b'a'), Ast::Char(b'b'), Ast::Char(b'c')]);
        assert_eq!(
            tree,
            Ast::Concat(
                Box::new(Ast::Concat(
                    Box::new(Ast::Char(b'a')),
                    Box::new(Ast::Char(b'b'))
                )),
                Box::new(Ast::Char(b'c'))
            )
        );
    }

    #[test]
    fn any_byte_is_negated_empty_class() {
        assert_eq!(
            Ast::any_byte(),
            Ast::CharClass {
                chars: BTreeSet::new(),
                negated: true
            }
        );
    }
}
