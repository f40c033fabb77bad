//! Subset construction and Hopcroft-style minimization (spec §4.3, "DFA
//! builder & minimizer (C3)"), plus the longest-match runtime (spec §4.4,
//! "DFA runtime (C4)").

use std::io;

use rustc_hash::FxHashMap;

use crate::regex::{
    ast::Ast,
    nfa::{Nfa, StateId as NfaStateId, Symbol, ALPHABET_SIZE, END_OF_TEXT, START_OF_TEXT},
    reader::TextReader,
};

pub type StateId = usize;

/// State 0 is always the dead (absorbing, non-accepting) state; a missing
/// transition is represented by routing to it rather than recording an
/// explicit self-loop edge (spec §4.3).
pub const DEAD_STATE: StateId = 0;

#[derive(Clone, Debug)]
pub struct DfaState {
    pub transitions: Box<[StateId; ALPHABET_SIZE]>,
    pub accept_actions: Vec<u32>,
}

impl DfaState {
    fn dead() -> Self {
        DfaState {
            transitions: Box::new([DEAD_STATE; ALPHABET_SIZE]),
            accept_actions: Vec::new(),
        }
    }

    pub fn is_accepting(&self) -> bool {
        !self.accept_actions.is_empty()
    }
}

/// A minimal DFA over the 258-symbol alphabet (256 byte values plus
/// `START_OF_TEXT`/`END_OF_TEXT`).
#[derive(Clone, Debug)]
pub struct Dfa {
    pub states: Vec<DfaState>,
    pub start: StateId,
}

impl Dfa {
    pub fn step(&self, state: StateId, symbol: Symbol) -> StateId {
        self.states[state].transitions[symbol as usize]
    }

    pub fn compile(ast: &Ast) -> Dfa {
        let mut nfa = Nfa::compile(ast);
        nfa.set_accept_action(1);
        Dfa::from_nfa(&nfa)
    }

    pub fn from_nfa(nfa: &Nfa) -> Dfa {
        minimize(subset_construct(nfa))
    }
}

/// Intermediate representation kept around only for minimization; the
/// `nfa_set` field drives the initial partition refinement and is dropped
/// once `minimize` produces the final [`Dfa`].
struct RawState {
    transitions: Vec<StateId>,
    accept_actions: Vec<u32>,
}

struct RawDfa {
    states: Vec<RawState>,
    start: StateId,
}

fn subset_construct(nfa: &Nfa) -> RawDfa {
    let mut id_of_set: FxHashMap<Vec<NfaStateId>, StateId> = FxHashMap::default();
    let mut sets: Vec<Vec<NfaStateId>> = Vec::new();
    let mut states: Vec<RawState> = Vec::new();

    id_of_set.insert(Vec::new(), DEAD_STATE);
    sets.push(Vec::new());
    states.push(RawState {
        transitions: vec![DEAD_STATE; ALPHABET_SIZE],
        accept_actions: Vec::new(),
    });

    let start_set = nfa.epsilon_closure([nfa.start]);
    let start = get_or_create(nfa, &mut id_of_set, &mut sets, &mut states, start_set);

    let mut worklist = vec![start];
    let mut processed = vec![false; states.len()];

    while let Some(id) = worklist.pop() {
        if processed[id] || id == DEAD_STATE {
            continue;
        }
        processed[id] = true;

        let nfa_set = sets[id].clone();
        for symbol in 0..ALPHABET_SIZE as Symbol {
            let mut targets = Vec::new();
            for &s in &nfa_set {
                for &(sym, to) in &nfa.states[s].input_transitions {
                    if sym == symbol {
                        targets.push(to);
                    }
                }
            }
            let closure = nfa.epsilon_closure(targets);
            let target_id = get_or_create(nfa, &mut id_of_set, &mut sets, &mut states, closure);
            states[id].transitions[symbol as usize] = target_id;
            if processed.len() <= target_id {
                processed.resize(target_id + 1, false);
            }
            if !processed[target_id] {
                worklist.push(target_id);
            }
        }
    }

    RawDfa { states, start }
}

fn get_or_create(
    nfa: &Nfa,
    id_of_set: &mut FxHashMap<Vec<NfaStateId>, StateId>,
    sets: &mut Vec<Vec<NfaStateId>>,
    states: &mut Vec<RawState>,
    mut set: Vec<NfaStateId>,
) -> StateId {
    set.sort_unstable();
    set.dedup();
    if let Some(&id) = id_of_set.get(&set) {
        return id;
    }
    let mut accept_actions: Vec<u32> = set
        .iter()
        .filter(|&&s| nfa.states[s].accept)
        .flat_map(|&s| nfa.states[s].accept_actions.iter().copied())
        .collect();
    accept_actions.sort_unstable();
    accept_actions.dedup();
    let id = states.len();
    states.push(RawState {
        transitions: vec![DEAD_STATE; ALPHABET_SIZE],
        accept_actions,
    });
    sets.push(set.clone());
    id_of_set.insert(set, id);
    id
}

/// Partition refinement (spec §4.3). Initial partition: one class per
/// distinct accept-action set, plus one for all non-accepting states; the
/// dead state gets its own singleton class and is pinned to state 0 in the
/// output. Classes split while two members disagree on which class a
/// symbol leads to; absent transitions (routing to the dead state) compare
/// equal to each other by construction, since they're literally the same
/// target id.
fn minimize(raw: RawDfa) -> Dfa {
    let n = raw.states.len();
    let mut class_key: FxHashMap<Vec<u32>, usize> = FxHashMap::default();
    let mut class_of = vec![0usize; n];
    for (id, state) in raw.states.iter().enumerate() {
        if id == DEAD_STATE {
            continue;
        }
        let key = state.accept_actions.clone();
        let next_id = class_key.len() + 1; // class 0 reserved for the dead state
        let class = *class_key.entry(key).or_insert(next_id);
        class_of[id] = class;
    }
    // class_of[DEAD_STATE] stays 0; every other state landed in 1..=class_key.len().

    let mut num_classes = class_key.len() + 1;
    loop {
        // Each new signature is keyed by (old class, per-symbol target
        // classes); since the old class is part of the key, a class can
        // only ever split here, never merge with a different one. Iterating
        // `id` from 0 up means the dead state (id 0, always alone in its
        // own class) is always assigned new class 0 first.
        let mut signature_key: FxHashMap<(usize, Vec<usize>), usize> = FxHashMap::default();
        let mut new_class_of = vec![0usize; n];
        for id in 0..n {
            let sig: Vec<usize> = raw.states[id]
                .transitions
                .iter()
                .map(|&t| class_of[t])
                .collect();
            let key = (class_of[id], sig);
            let next_id = signature_key.len();
            let class = *signature_key.entry(key).or_insert(next_id);
            new_class_of[id] = class;
        }
        class_of = new_class_of;
        // Classes only ever refine (split), never coarsen, so an unchanged
        // count means a fixed point: no class split this round.
        if signature_key.len() == num_classes {
            break;
        }
        num_classes = signature_key.len();
    }

    build_from_classes(&raw, &class_of)
}

fn build_from_classes(raw: &RawDfa, class_of: &[usize]) -> Dfa {
    let num_classes = class_of.iter().copied().max().map_or(1, |m| m + 1);
    // Representative = lowest old state id in each class; state 0's class
    // must map to new id 0 (already guaranteed since class_of[DEAD_STATE] == 0
    // and classes are dense from 0).
    let mut representative = vec![usize::MAX; num_classes];
    for (id, &class) in class_of.iter().enumerate() {
        if representative[class] == usize::MAX {
            representative[class] = id;
        }
    }

    let mut states = Vec::with_capacity(num_classes);
    for &rep in &representative {
        let raw_state = &raw.states[rep];
        let mut transitions = Box::new([DEAD_STATE; ALPHABET_SIZE]);
        for (sym, &target) in raw_state.transitions.iter().enumerate() {
            transitions[sym] = class_of[target];
        }
        states.push(DfaState {
            transitions,
            accept_actions: raw_state.accept_actions.clone(),
        });
    }
    debug_assert!(!states[DEAD_STATE].is_accepting());

    Dfa {
        states,
        start: class_of[raw.start],
    }
}

/// Outcome of [`match_longest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult {
    pub accepted: bool,
    /// Rune position just past the match (equal to `start_pos` for an
    /// accepted empty match).
    pub end_pos: usize,
    /// Furthest rune position the runtime inspected while searching.
    pub lookahead_pos: usize,
    pub accept_actions: Vec<u32>,
    pub bytes_read_at_last_accept: usize,
}

fn is_utf8_start_byte(b: u8) -> bool {
    b & 0b1100_0000 != 0b1000_0000
}

fn union_actions(dfa: &Dfa, states: &[StateId]) -> Vec<u32> {
    let mut actions: Vec<u32> = states
        .iter()
        .flat_map(|&s| dfa.states[s].accept_actions.iter().copied())
        .collect();
    actions.sort_unstable();
    actions.dedup();
    actions
}

/// Longest-match scan starting at rune position `start_pos`, never
/// inspecting past rune position `text_length` (spec §4.4).
///
/// On return, `reader` has been seeked back to just past the accepted
/// match (or to its original position, if nothing matched).
pub fn match_longest<R: TextReader + ?Sized>(
    dfa: &Dfa,
    reader: &mut R,
    start_pos: usize,
    text_length: usize,
) -> io::Result<MatchResult> {
    let dedup_live = |mut v: Vec<StateId>| {
        v.sort_unstable();
        v.dedup();
        v.retain(|&s| s != DEAD_STATE);
        v
    };

    let mut live: Vec<StateId> = if start_pos == 0 {
        dedup_live(vec![dfa.start, dfa.step(dfa.start, START_OF_TEXT)])
    } else {
        dedup_live(vec![dfa.start])
    };

    let mut rune_pos = start_pos;
    let mut lookahead_pos = start_pos;
    let mut bytes_read_total = 0usize;
    let mut last_accept: Option<(usize, usize, Vec<u32>)> = None;
    let mut reached_eot = false;

    let mut chunk = [0u8; 256];
    let mut chunk_len = 0usize;
    let mut chunk_pos = 0usize;

    loop {
        if rune_pos >= text_length || live.is_empty() {
            if rune_pos >= text_length {
                reached_eot = true;
            }
            break;
        }
        if chunk_pos == chunk_len {
            chunk_len = reader.read(&mut chunk)?;
            chunk_pos = 0;
            if chunk_len == 0 {
                reached_eot = true;
                break;
            }
        }
        let byte = chunk[chunk_pos];
        chunk_pos += 1;
        bytes_read_total += 1;

        if is_utf8_start_byte(byte) {
            rune_pos += 1;
        }
        lookahead_pos = lookahead_pos.max(rune_pos);

        live = dedup_live(live.iter().map(|&s| dfa.step(s, byte as Symbol)).collect());

        let actions = union_actions(dfa, &live);
        if !actions.is_empty() {
            last_accept = Some((rune_pos, bytes_read_total, actions));
        }
    }

    if reached_eot && !live.is_empty() {
        let eot_live = dedup_live(live.iter().map(|&s| dfa.step(s, END_OF_TEXT)).collect());
        let actions = union_actions(dfa, &eot_live);
        if !actions.is_empty() {
            last_accept = Some((rune_pos, bytes_read_total, actions));
        }
    }

    Ok(match last_accept {
        Some((end_pos, bytes_at_accept, accept_actions)) => {
            reader.seek_backward(bytes_read_total - bytes_at_accept)?;
            MatchResult {
                accepted: true,
                end_pos,
                lookahead_pos,
                accept_actions,
                bytes_read_at_last_accept: bytes_at_accept,
            }
        }
        None => {
            reader.seek_backward(bytes_read_total)?;
            MatchResult {
                accepted: false,
                end_pos: start_pos,
                lookahead_pos,
                accept_actions: Vec::new(),
                bytes_read_at_last_accept: 0,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::{parser::parse, reader::SliceReader};

    fn dfa_for(pattern: &str) -> Dfa {
        Dfa::compile(&parse(pattern).unwrap())
    }

    fn run(dfa: &Dfa, text: &[u8], start_pos: usize) -> MatchResult {
        let mut reader = SliceReader::new(text);
        match_longest(dfa, &mut reader, start_pos, text.len()).unwrap()
    }

    #[test]
    fn matches_literal() {
        let dfa = dfa_for("abc");
        let r = run(&dfa, b"abcd", 0);
        assert!(r.accepted);
        assert_eq!(r.end_pos, 3);
    }

    #[test]
    fn longest_match_wins_over_shorter_prefix() {
        let dfa = dfa_for("a|ab");
        let r = run(&dfa, b"ab", 0);
        assert!(r.accepted);
        assert_eq!(r.end_pos, 2);
    }

    #[test]
    fn star_accepts_empty_match() {
        let dfa = dfa_for("a*");
        let r = run(&dfa, b"bbb", 0);
        assert!(r.accepted);
        assert_eq!(r.end_pos, 0);
    }

    #[test]
    fn no_match_returns_unaccepted_and_restores_position() {
        let dfa = dfa_for("xyz");
        let mut reader = SliceReader::new(b"abc");
        let r = match_longest(&dfa, &mut reader, 0, 3).unwrap();
        assert!(!r.accepted);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn caret_anchors_to_start_of_text() {
        let dfa = dfa_for("^a");
        let r = run(&dfa, b"a", 0);
        assert!(r.accepted);
        assert_eq!(r.end_pos, 1);

        // Not at position 0: the SoT branch isn't live, so `^a` can't match.
        let mut r2 = SliceReader::at(b"ba", 1);
        let res = match_longest(&dfa, &mut r2, 1, 2).unwrap();
        assert!(!res.accepted);
    }

    #[test]
    fn dollar_anchors_to_end_of_text() {
        let dfa = dfa_for("a$");
        let r = run(&dfa, b"a", 0);
        assert!(r.accepted);
        assert_eq!(r.end_pos, 1);

        let r2 = run(&dfa, b"ab", 0);
        assert!(!r2.accepted);
    }

    #[test]
    fn multibyte_utf8_counts_as_single_rune() {
        let dfa = dfa_for(r"\p{L}+");
        let text = "héllo".as_bytes();
        let r = run(&dfa, text, 0);
        assert!(r.accepted);
        assert_eq!(r.end_pos, 5); // 5 runes, not 6 bytes
    }

    #[test]
    fn minimization_collapses_equivalent_states() {
        // (a|b)*abb — classic example with an 8-state naive NFA that
        // minimizes to 4 non-dead DFA states (spec scenario S5).
        let dfa = dfa_for("(a|b)*abb");
        let non_dead = dfa.states.len() - 1;
        assert_eq!(non_dead, 4);
    }
}
