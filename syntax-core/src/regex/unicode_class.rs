//! Byte-level automaton for a named Unicode category (spec §3 "DFA for
//! Unicode categories (C10)", §4.10).
//!
//! Construction: trie over the category's UTF-8-encoded byte-range
//! sequences (shared prefixes share states) → DFA via subset construction
//! → minimize → back to an NFA with a single accept action, ready to be
//! spliced (and have that action stripped) into a larger pattern by
//! [`crate::regex::nfa::Nfa::compile`]. Minimizing before embedding is what
//! keeps categories like `\p{L}` — thousands of code point ranges — from
//! blowing up the combined tokenizer automaton.

use syntax_unicode::RangeTable;

use crate::regex::{
    dfa::{Dfa, DEAD_STATE},
    nfa::{Nfa, NfaState},
};

const PLACEHOLDER_ACTION: u32 = 1;

struct TrieNode {
    children: Vec<(u8, u8, usize)>,
    accept: bool,
}

fn build_trie(sequences: &[Vec<(u8, u8)>]) -> Vec<TrieNode> {
    let mut nodes = vec![TrieNode {
        children: Vec::new(),
        accept: false,
    }];
    for seq in sequences {
        let mut cur = 0;
        for &(lo, hi) in seq {
            let existing = nodes[cur]
                .children
                .iter()
                .find(|&&(l, h, _)| l == lo && h == hi)
                .map(|&(_, _, child)| child);
            cur = match existing {
                Some(child) => child,
                None => {
                    let new_id = nodes.len();
                    nodes.push(TrieNode {
                        children: Vec::new(),
                        accept: false,
                    });
                    nodes[cur].children.push((lo, hi, new_id));
                    new_id
                }
            };
        }
        nodes[cur].accept = true;
    }
    nodes
}

/// The trie is already deterministic (byte ranges sharing a node never
/// overlap, since they come from `regex_syntax`'s disjoint UTF-8
/// range-splitting), so this NFA has no nondeterminism to remove — only
/// redundant states for minimization to collapse.
fn trie_to_nfa(nodes: &[TrieNode]) -> Nfa {
    let mut states: Vec<NfaState> = nodes
        .iter()
        .map(|n| NfaState {
            accept: n.accept,
            accept_actions: if n.accept {
                vec![PLACEHOLDER_ACTION]
            } else {
                Vec::new()
            },
            ..Default::default()
        })
        .collect();
    for (id, node) in nodes.iter().enumerate() {
        for &(lo, hi, child) in &node.children {
            for b in lo..=hi {
                states[id].input_transitions.push((b as u16, child));
            }
        }
    }
    Nfa { states, start: 0 }
}

/// Convert a minimized DFA back to an NFA, dropping edges to the dead state
/// (equivalent to simply having no edge) and renumbering so the DFA's start
/// state becomes NFA state 0, preserving the invariant the composition
/// operators in [`crate::regex::nfa`] rely on.
fn dfa_to_nfa(dfa: &Dfa) -> Nfa {
    let n = dfa.states.len();
    let mut order = vec![dfa.start];
    order.extend((0..n).filter(|&id| id != dfa.start));
    let mut old_to_new = vec![0usize; n];
    for (new_id, &old_id) in order.iter().enumerate() {
        old_to_new[old_id] = new_id;
    }

    let states = order
        .iter()
        .map(|&old_id| {
            let s = &dfa.states[old_id];
            NfaState {
                accept: s.is_accepting(),
                accept_actions: s.accept_actions.clone(),
                ..Default::default()
            }
        })
        .collect::<Vec<_>>();
    let mut nfa = Nfa { states, start: 0 };

    for (new_id, &old_id) in order.iter().enumerate() {
        for symbol in 0u16..256 {
            let target = dfa.states[old_id].transitions[symbol as usize];
            if target != DEAD_STATE {
                nfa.states[new_id]
                    .input_transitions
                    .push((symbol, old_to_new[target]));
            }
        }
    }
    nfa
}

/// Build a (not yet embedded) NFA accepting the UTF-8 encoding of any code
/// point in `table`, tagged with a single placeholder accept action that
/// [`Nfa::clear_accept_actions`] strips before splicing.
pub fn build(table: &RangeTable) -> Nfa {
    let sequences = syntax_unicode::byte_sequences(table);
    let trie = build_trie(&sequences);
    let nfa = trie_to_nfa(&trie);
    let dfa = Dfa::from_nfa(&nfa);
    dfa_to_nfa(&dfa)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(nfa: &Nfa, bytes: &[u8]) -> bool {
        let mut current = nfa.epsilon_closure([nfa.start]);
        for &b in bytes {
            let mut next = std::collections::BTreeSet::new();
            for &s in &current {
                for &(sym, to) in &nfa.states[s].input_transitions {
                    if sym == b as u16 {
                        next.insert(to);
                    }
                }
            }
            current = nfa.epsilon_closure(next);
        }
        current.iter().any(|&s| nfa.states[s].accept)
    }

    #[test]
    fn matches_ascii_digits() {
        let table = syntax_unicode::lookup("Nd").unwrap();
        let nfa = build(&table);
        assert!(matches(&nfa, b"0"));
        assert!(matches(&nfa, b"9"));
        assert!(!matches(&nfa, b"a"));
    }

    #[test]
    fn matches_multibyte_code_point() {
        let table = syntax_unicode::lookup("Nd").unwrap();
        let nfa = build(&table);
        assert!(matches(&nfa, "٣".as_bytes()));
    }

    #[test]
    fn rejects_truncated_multibyte_sequence() {
        let table = syntax_unicode::lookup("Nd").unwrap();
        let nfa = build(&table);
        let full = "٣".as_bytes();
        assert!(!matches(&nfa, &full[..1]));
    }

    #[test]
    fn start_state_is_zero() {
        let table = syntax_unicode::lookup("L").unwrap();
        let nfa = build(&table);
        assert_eq!(nfa.start, 0);
    }
}
