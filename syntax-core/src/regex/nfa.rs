//! Thompson construction: `Ast` → ε-NFA (spec §3 "NFA (C2)", §4.2).
//!
//! States live in a flat arena (`Vec<NfaState>`) addressed by [`StateId`]
//! rather than as a pointer graph, per the Design Notes' guidance to keep
//! automata data self-contained and `Clone`-cheap. Composition operators
//! (`union`, `concat`, `star`) consume their operands and splice the
//! arenas together, renumbering so the combined automaton's state 0 is
//! always its start state.

use std::collections::BTreeSet;

use crate::regex::ast::Ast;

pub type StateId = usize;

/// An input symbol the DFA runtime feeds the automaton: a literal byte, or
/// one of the two synthetic sentinels bracketing the scanned text (spec
/// §4.4).
pub type Symbol = u16;
pub const START_OF_TEXT: Symbol = 256;
pub const END_OF_TEXT: Symbol = 257;
pub const ALPHABET_SIZE: usize = 258;

#[derive(Clone, Debug, Default)]
pub struct NfaState {
    pub empty_transitions: Vec<StateId>,
    pub input_transitions: Vec<(Symbol, StateId)>,
    pub accept: bool,
    pub accept_actions: Vec<u32>,
}

/// An ε-NFA with a single start state (always index 0) and zero or more
/// accepting states, each optionally tagged with the rule action that fired
/// when the match completed there.
#[derive(Clone, Debug)]
pub struct Nfa {
    pub states: Vec<NfaState>,
    pub start: StateId,
}

impl Nfa {
    fn single(accept: bool) -> Nfa {
        Nfa {
            states: vec![NfaState {
                accept,
                ..Default::default()
            }],
            start: 0,
        }
    }

    pub fn empty_language() -> Nfa {
        Nfa::single(false)
    }

    pub fn empty_string() -> Nfa {
        Nfa::single(true)
    }

    /// `start --byte--> accept` for each byte in `chars`.
    pub fn chars(chars: &BTreeSet<u8>) -> Nfa {
        let mut nfa = Nfa {
            states: vec![NfaState::default(), NfaState {
                accept: true,
                ..Default::default()
            }],
            start: 0,
        };
        for &b in chars {
            nfa.states[0].input_transitions.push((b as Symbol, 1));
        }
        nfa
    }

    /// The complement: one edge per byte *not* in `chars`.
    pub fn negated_chars(chars: &BTreeSet<u8>) -> Nfa {
        let complement: BTreeSet<u8> = (0u16..=255)
            .map(|b| b as u8)
            .filter(|b| !chars.contains(b))
            .collect();
        Nfa::chars(&complement)
    }

    pub fn start_of_text() -> Nfa {
        Nfa::sentinel(START_OF_TEXT)
    }

    pub fn end_of_text() -> Nfa {
        Nfa::sentinel(END_OF_TEXT)
    }

    fn sentinel(symbol: Symbol) -> Nfa {
        let mut nfa = Nfa {
            states: vec![NfaState::default(), NfaState {
                accept: true,
                ..Default::default()
            }],
            start: 0,
        };
        nfa.states[0].input_transitions.push((symbol, 1));
        nfa
    }

    /// Append `other`'s states after `self`'s, returning the offset applied
    /// to every one of `other`'s state ids.
    fn splice(&mut self, other: Nfa) -> usize {
        let offset = self.states.len();
        for mut state in other.states {
            for id in &mut state.empty_transitions {
                *id += offset;
            }
            for (_, id) in &mut state.input_transitions {
                *id += offset;
            }
            self.states.push(state);
        }
        offset
    }

    /// `A | B`: fresh start with ε-edges to both starts; every accepting
    /// state of either operand stays accepting (spec: "accept states
    /// unified").
    pub fn union(a: Nfa, b: Nfa) -> Nfa {
        let mut nfa = Nfa {
            states: vec![NfaState::default()],
            start: 0,
        };
        let a_off = nfa.splice(a.clone());
        let b_off = nfa.splice(b);
        nfa.states[0].empty_transitions.push(a.start + a_off);
        nfa.states[0].empty_transitions.push(b_off); // b.start == 0 pre-splice
        nfa
    }

    pub fn union_many(nfas: impl IntoIterator<Item = Nfa>) -> Nfa {
        let mut iter = nfas.into_iter();
        let Some(first) = iter.next() else {
            return Nfa::empty_language();
        };
        iter.fold(first, Nfa::union)
    }

    /// `A · B`: every accept of `A` gets an ε-edge to `B`'s start and stops
    /// being accepting; any action tags it carried merge into `B`'s starts
    /// that are themselves accepting (relevant only when splicing
    /// pre-tagged sub-automata; plain AST compilation tags nothing until
    /// the whole pattern is built).
    pub fn concat(a: Nfa, b: Nfa) -> Nfa {
        let a_start = a.start;
        let mut nfa = Nfa {
            states: a.states,
            start: a_start,
        };
        let b_off = nfa.splice(b);
        let b_start = b_off; // b.start was 0 before splicing
        let mut carried_actions = Vec::new();
        for state in &mut nfa.states[..b_off] {
            if state.accept {
                state.accept = false;
                carried_actions.extend(state.accept_actions.drain(..));
                state.empty_transitions.push(b_start);
            }
        }
        if !carried_actions.is_empty() {
            carried_actions.sort_unstable();
            carried_actions.dedup();
            for state in &mut nfa.states[b_off..] {
                if state.accept {
                    state.accept_actions.extend(carried_actions.iter().copied());
                    state.accept_actions.sort_unstable();
                    state.accept_actions.dedup();
                }
            }
        }
        nfa
    }

    pub fn concat_many(nfas: impl IntoIterator<Item = Nfa>) -> Nfa {
        let mut iter = nfas.into_iter();
        let Some(first) = iter.next() else {
            return Nfa::empty_string();
        };
        iter.fold(first, Nfa::concat)
    }

    /// `A*`: start becomes accepting; every accept of `A` ε-back-edges to
    /// start.
    pub fn star(a: Nfa) -> Nfa {
        let mut nfa = Nfa {
            states: vec![NfaState {
                accept: true,
                ..Default::default()
            }],
            start: 0,
        };
        let off = nfa.splice(a);
        nfa.states[0].empty_transitions.push(off);
        let loop_back = 0;
        for state in &mut nfa.states[off..] {
            if state.accept {
                state.empty_transitions.push(loop_back);
            }
        }
        nfa
    }

    /// Overwrite every accepting state's action list with `[action]`.
    pub fn set_accept_action(&mut self, action: u32) {
        for s in &mut self.states {
            if s.accept {
                s.accept_actions = vec![action];
            }
        }
    }

    /// Strip accept-action tags while leaving `accept` flags intact, for
    /// embedding a sub-automaton (e.g. a Unicode category) whose own
    /// matches shouldn't be independently taggable (spec §4.2).
    pub fn clear_accept_actions(&mut self) {
        for s in &mut self.states {
            s.accept_actions.clear();
        }
    }

    pub fn epsilon_closure(&self, states: impl IntoIterator<Item = StateId>) -> Vec<StateId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<StateId> = states.into_iter().collect();
        while let Some(s) = stack.pop() {
            if !seen.insert(s) {
                continue;
            }
            stack.extend(self.states[s].empty_transitions.iter().copied());
        }
        seen.into_iter().collect()
    }

    /// Compile a full `Ast` into an `Nfa` with no accept action assigned
    /// yet; callers tag the result via [`Nfa::set_accept_action`].
    pub fn compile(ast: &Ast) -> Nfa {
        match ast {
            Ast::Empty => Nfa::empty_string(),
            Ast::Char(b) => Nfa::chars(&BTreeSet::from([*b])),
            Ast::CharClass { chars, negated } => {
                if *negated {
                    Nfa::negated_chars(chars)
                } else {
                    Nfa::chars(chars)
                }
            }
            Ast::UnicodeCategory(table) => {
                let mut nfa = crate::regex::unicode_class::build(table);
                nfa.clear_accept_actions();
                nfa
            }
            Ast::StartOfText => Nfa::start_of_text(),
            Ast::EndOfText => Nfa::end_of_text(),
            Ast::Concat(a, b) => Nfa::concat(Nfa::compile(a), Nfa::compile(b)),
            Ast::Union(a, b) => Nfa::union(Nfa::compile(a), Nfa::compile(b)),
            Ast::Star(a) => Nfa::star(Nfa::compile(a)),
            Ast::Paren(inner) => Nfa::compile(inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(ast: &Ast) -> Nfa {
        let mut nfa = Nfa::compile(ast);
        nfa.set_accept_action(1);
        nfa
    }

    fn matches(nfa: &Nfa, input: &[u8]) -> bool {
        let mut current = nfa.epsilon_closure([nfa.start]);
        for &b in input {
            let mut next = BTreeSet::new();
            for &s in &current {
                for &(sym, to) in &nfa.states[s].input_transitions {
                    if sym == b as Symbol {
                        next.insert(to);
                    }
                }
            }
            current = nfa.epsilon_closure(next);
        }
        current.iter().any(|&s| nfa.states[s].accept)
    }

    #[test]
    fn concat_matches_sequence() {
        let ast = Ast::concat_all(vec![Ast::Char(b'a'), Ast::Char(b'b')]);
        let nfa = compiled(&ast);
        assert!(matches(&nfa, b"ab"));
        assert!(!matches(&nfa, b"a"));
        assert!(!matches(&nfa, b"ac"));
    }

    #[test]
    fn star_matches_zero_or_more() {
        let nfa = compiled(&Ast::star(Ast::Char(b'a')));
        assert!(matches(&nfa, b""));
        assert!(matches(&nfa, b"a"));
        assert!(matches(&nfa, b"aaaa"));
        assert!(!matches(&nfa, b"aab"));
    }

    #[test]
    fn union_matches_either_branch() {
        let ast = Ast::union(Ast::Char(b'a'), Ast::Char(b'b'));
        let nfa = compiled(&ast);
        assert!(matches(&nfa, b"a"));
        assert!(matches(&nfa, b"b"));
        assert!(!matches(&nfa, b"c"));
    }

    #[test]
    fn negated_class_excludes_listed_bytes() {
        let ast = Ast::char_class(BTreeSet::from([b'a']), true);
        let nfa = compiled(&ast);
        assert!(matches(&nfa, b"b"));
        assert!(!matches(&nfa, b"a"));
    }

    #[test]
    fn accept_action_tags_final_states() {
        let nfa = compiled(&Ast::Char(b'a'));
        let accepting: Vec<_> = nfa
            .states
            .iter()
            .filter(|s| s.accept)
            .flat_map(|s| s.accept_actions.iter().copied())
            .collect();
        assert_eq!(accepting, vec![1]);
    }

    #[test]
    fn unicode_category_matches_multibyte_utf8() {
        let table = syntax_unicode::lookup("Nd").unwrap();
        let nfa = compiled(&Ast::UnicodeCategory(std::sync::Arc::new(table)));
        assert!(matches(&nfa, "0".as_bytes()));
        assert!(matches(&nfa, "٣".as_bytes())); // ARABIC-INDIC DIGIT THREE, U+0663
        assert!(!matches(&nfa, b"a"));
    }
}
