//! Fuzzy search index for the command menu (spec §3, §4.11 "Fuzzy index
//! (C11) — brief"): a keyword trie mapping lowercased keywords to the
//! record ids that contain them, multi-keyword queries intersected (AND),
//! candidates ranked and truncated to the top `K`.
//!
//! `ib-matcher` is itself a fuzzy string matcher, though its pinyin/
//! romaji machinery is out of scope here; this module borrows only its
//! general shape (build an index over keyword byte sequences, score
//! candidates, return the best), not its matcher internals.

use rustc_hash::{FxHashMap, FxHashSet};

/// Number of results returned by [`MenuIndex::search`] (spec §4.11: "top K
/// (K = 100)").
pub const TOP_K: usize = 100;

/// One entry in the menu (a command, a file, whatever the host indexes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub u32);

/// A keyword trie over lowercased keywords, mapping each keyword to the
/// set of record ids that contain it.
///
/// Keys are normalized with [`str::to_lowercase`] (spec: "lowercased
/// unicode-normalized keywords" — Unicode case folding beyond simple
/// lowercasing is out of scope per spec.md §1's Non-goals on Unicode
/// normalization).
pub struct MenuIndex {
    trie: Trie,
    records: FxHashMap<RecordId, Record>,
}

struct Record {
    /// Original (not lowercased) text, kept for case-sensitive scoring
    /// and for returning to the caller.
    text: String,
}

impl MenuIndex {
    pub fn new() -> MenuIndex {
        MenuIndex {
            trie: Trie::new(),
            records: FxHashMap::default(),
        }
    }

    /// Index `text` under `id`, tokenizing it into whitespace-separated
    /// keywords. Re-indexing an existing id replaces its previous text.
    pub fn insert(&mut self, id: RecordId, text: &str) {
        self.remove(id);
        for word in text.split_whitespace() {
            self.trie.insert(&word.to_lowercase(), id);
        }
        self.records.insert(id, Record { text: text.to_string() });
    }

    pub fn remove(&mut self, id: RecordId) {
        if let Some(record) = self.records.remove(&id) {
            for word in record.text.split_whitespace() {
                self.trie.remove(&word.to_lowercase(), id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Search for records whose indexed text contains every whitespace-
    /// separated keyword in `query` as a substring of some indexed
    /// keyword (prefix and substring both match, since lookup walks the
    /// trie by byte and collects every keyword below the query's node).
    /// Returns at most [`TOP_K`] results, sorted by score descending,
    /// ties broken by `RecordId` for determinism.
    pub fn search(&self, query: &str) -> Vec<(RecordId, i64)> {
        let keywords: Vec<String> = query.split_whitespace().map(|w| w.to_lowercase()).collect();
        if keywords.is_empty() {
            return Vec::new();
        }

        let mut candidates: Option<FxHashSet<RecordId>> = None;
        for kw in &keywords {
            let matches = self.trie.ids_under_prefix(kw);
            candidates = Some(match candidates {
                None => matches,
                Some(acc) => acc.intersection(&matches).copied().collect(),
            });
            if candidates.as_ref().is_some_and(|c| c.is_empty()) {
                return Vec::new();
            }
        }
        let candidates = candidates.unwrap_or_default();

        let mut scored: Vec<(RecordId, i64)> = candidates
            .into_iter()
            .filter_map(|id| {
                let record = self.records.get(&id)?;
                Some((id, score(&record.text, &keywords)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(TOP_K);
        scored
    }
}

impl Default for MenuIndex {
    fn default() -> Self {
        MenuIndex::new()
    }
}

/// Score rewarding (spec §4.11): (a) contiguous substring matches of the
/// query over scattered matches, (b) case-sensitive matches over
/// case-insensitive ones, (c) earlier match positions.
fn score(text: &str, keywords: &[String]) -> i64 {
    let lower = text.to_lowercase();
    let mut total = 0i64;
    for kw in keywords {
        let (pos_ci, contiguous_ci) = best_match(&lower, kw);
        let (pos_cs, contiguous_cs) = best_match(text, kw);
        let (pos, contiguous, case_bonus) = if contiguous_cs || pos_cs.is_some() {
            (pos_cs, contiguous_cs, 1_000i64)
        } else {
            (pos_ci, contiguous_ci, 0i64)
        };
        let Some(pos) = pos else { continue };
        total += case_bonus;
        if contiguous {
            total += 500;
        }
        // Earlier positions score higher; clamp so a very late match still
        // contributes a small positive amount rather than going negative.
        total += 200 - (pos as i64).min(200);
    }
    total
}

/// Find `needle` as a substring of `haystack`; returns `(position,
/// is_contiguous)`. Every substring match is contiguous by construction,
/// so this always yields `(Some(p), true)` on a hit — kept as a pair for
/// symmetry with a future subsequence-matching mode (see spec.md §4.11's
/// "contiguous substring matches" wording, which only requires this
/// exact-substring case).
fn best_match(haystack: &str, needle: &str) -> (Option<usize>, bool) {
    match haystack.find(needle) {
        Some(byte_pos) => (Some(byte_pos), true),
        None => (None, false),
    }
}

/// A byte trie over keyword strings, storing the set of record ids under
/// each keyword and every keyword that extends it — so a query prefix
/// matches every indexed keyword that starts with it.
struct Trie {
    root: TrieNode,
}

#[derive(Default)]
struct TrieNode {
    children: FxHashMap<u8, TrieNode>,
    /// Ids of records whose keyword ends exactly here, or passes through
    /// here as a prefix — aggregated so prefix lookup is O(query length)
    /// instead of a subtree walk.
    ids_here_and_below: FxHashSet<RecordId>,
}

impl Trie {
    fn new() -> Trie {
        Trie { root: TrieNode::default() }
    }

    fn insert(&mut self, keyword: &str, id: RecordId) {
        let mut node = &mut self.root;
        node.ids_here_and_below.insert(id);
        for byte in keyword.bytes() {
            node = node.children.entry(byte).or_default();
            node.ids_here_and_below.insert(id);
        }
    }

    fn remove(&mut self, keyword: &str, id: RecordId) {
        remove_rec(&mut self.root, keyword.as_bytes(), id);
    }

    fn ids_under_prefix(&self, prefix: &str) -> FxHashSet<RecordId> {
        let mut node = &self.root;
        for byte in prefix.bytes() {
            match node.children.get(&byte) {
                Some(next) => node = next,
                None => return FxHashSet::default(),
            }
        }
        node.ids_here_and_below.clone()
    }
}

fn remove_rec(node: &mut TrieNode, rest: &[u8], id: RecordId) {
    node.ids_here_and_below.remove(&id);
    if let Some((&byte, tail)) = rest.split_first() {
        if let Some(child) = node.children.get_mut(&byte) {
            remove_rec(child, tail, id);
            if child.ids_here_and_below.is_empty() && child.children.is_empty() {
                node.children.remove(&byte);
            }
        }
    }
}
