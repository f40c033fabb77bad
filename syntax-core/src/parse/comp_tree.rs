//! Incremental computation tree (spec §3 "Computation node (C9)", §4.9):
//! a cache of prior sub-parse results keyed by where in the text they
//! started, reused across a reparse whenever the cached `start_state`
//! still matches and the cached `read_length` stays within the distance
//! to the nearest edit.
//!
//! Node offsets are never stored — each node's position is the sum of the
//! `consumed_length` of every node before it, exactly like a rope. That
//! makes invalidation trivial: discarding the nodes touched by an edit and
//! merging the untouched halves back together is enough; nothing needs a
//! `shift_positions_after` pass the way [`crate::token_tree::TokenTree`]
//! does, because nothing downstream ever stored an absolute position to
//! begin with.
//!
//! One simplification versus the literal spec wording: "the largest
//! sub-computation rooted at q" suggests internal treap nodes should
//! themselves be directly reusable merged spans. This implementation
//! instead reuses one leaf computation at a time — still O(log n) to
//! locate, still correct, just coarser-grained caching than a fully
//! Append-merged lookup would give (see DESIGN.md).

use std::cmp::Ordering;

use crate::parse::combinators::{ComputedToken, ParseOutcome, Parser};
use crate::parse::rune_iter::RuneIter;

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// One memoized parse result (spec §3: `{read_length, consumed_length,
/// start_state, end_state, tokens, left, right}` — `left`/`right` are the
/// treap's own child links here, not stored in the payload).
#[derive(Clone, Debug)]
pub struct CompNode<S> {
    pub consumed_length: usize,
    pub read_length: usize,
    pub start_state: S,
    pub end_state: S,
    pub tokens: Vec<ComputedToken>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Agg {
    total_consumed: usize,
    max_read_length: usize,
}

struct TreapNode<S> {
    node: CompNode<S>,
    priority: u64,
    left: Link<S>,
    right: Link<S>,
    agg: Agg,
}

type Link<S> = Option<Box<TreapNode<S>>>;

fn agg_of<S>(link: &Link<S>) -> Agg {
    link.as_ref().map_or(Agg::default(), |n| n.agg)
}

fn recompute<S>(n: &mut TreapNode<S>) {
    let l = agg_of(&n.left);
    let r = agg_of(&n.right);
    n.agg = Agg {
        total_consumed: l.total_consumed + n.node.consumed_length + r.total_consumed,
        max_read_length: l
            .max_read_length
            .max(n.node.read_length)
            .max(r.max_read_length),
    };
}

fn merge<S>(a: Link<S>, b: Link<S>) -> Link<S> {
    match (a, b) {
        (None, b) => b,
        (a, None) => a,
        (Some(mut an), Some(mut bn)) => {
            if an.priority >= bn.priority {
                an.right = merge(an.right.take(), Some(bn));
                recompute(&mut an);
                Some(an)
            } else {
                bn.left = merge(Some(an), bn.left.take());
                recompute(&mut bn);
                Some(bn)
            }
        }
    }
}

/// Split so the left result holds every node whose implicit start offset
/// is `< k` (same start-offset-membership convention as
/// [`crate::token_tree`]'s `delete_range`, not a span-overlap test).
fn split_before<S>(link: Link<S>, k: usize) -> (Link<S>, Link<S>) {
    match link {
        None => (None, None),
        Some(mut n) => {
            let left_total = agg_of(&n.left).total_consumed;
            if left_total < k {
                let (rl, rr) = split_before(n.right.take(), k.saturating_sub(left_total + n.node.consumed_length));
                n.right = rl;
                recompute(&mut n);
                (Some(n), rr)
            } else {
                let (ll, lr) = split_before(n.left.take(), k);
                n.left = lr;
                recompute(&mut n);
                (ll, Some(n))
            }
        }
    }
}

fn find_at<S>(link: &Link<S>, offset: usize) -> Option<&CompNode<S>> {
    let n = link.as_ref()?;
    let left_total = agg_of(&n.left).total_consumed;
    match offset.cmp(&left_total) {
        Ordering::Less => find_at(&n.left, offset),
        Ordering::Equal => Some(&n.node),
        Ordering::Greater => find_at(&n.right, offset - left_total - n.node.consumed_length),
    }
}

/// A cache of sub-parse results for one document (spec §3 "Lifecycles":
/// per-document, owned by the buffer).
pub struct CompTree<S> {
    root: Link<S>,
    next_seed: u64,
}

impl<S> CompTree<S> {
    pub fn new() -> CompTree<S> {
        CompTree {
            root: None,
            next_seed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn total_consumed(&self) -> usize {
        agg_of(&self.root).total_consumed
    }

    pub fn max_read_length(&self) -> usize {
        agg_of(&self.root).max_read_length
    }

    /// Append a newly computed sub-parse to the end of the cache.
    pub fn append(&mut self, node: CompNode<S>) {
        let priority = splitmix64(self.next_seed);
        self.next_seed += 1;
        let mut new_node = Box::new(TreapNode {
            node,
            priority,
            left: None,
            right: None,
            agg: Agg::default(),
        });
        recompute(&mut new_node);
        self.root = merge(self.root.take(), Some(new_node));
    }

    /// The cached computation starting exactly at `offset`, if its
    /// `start_state` matches `want_state` and its `read_length` fits
    /// within `max_read_length` (spec §4.9).
    pub fn find_reusable(&self, offset: usize, want_state: &S, max_read_length: usize) -> Option<&CompNode<S>>
    where
        S: PartialEq,
    {
        find_at(&self.root, offset).filter(|n| n.start_state == *want_state && n.read_length <= max_read_length)
    }

    /// Discard every cached computation an edit at `edit_pos`
    /// (`num_deleted` old bytes removed there) could have invalidated
    /// (spec §4.9). Nodes starting before `edit_pos - max_read_length()`
    /// cannot have looked far enough ahead to reach the edit, by
    /// definition of the tree's own aggregate, so they're always safe to
    /// keep; nothing past the discarded window needs repositioning since
    /// this tree's offsets are derived, never stored.
    pub fn invalidate(&mut self, edit_pos: usize, num_deleted: usize) {
        let lookahead = self.max_read_length();
        let window_lo = edit_pos.saturating_sub(lookahead);
        let window_hi = edit_pos + num_deleted;
        let root = self.root.take();
        let (left, rest) = split_before(root, window_lo);
        let (_removed, right) = split_before(rest, window_hi - window_lo);
        self.root = merge(left, right);
    }
}

impl<S> Default for CompTree<S> {
    fn default() -> Self {
        CompTree::new()
    }
}

/// Drive `parser` forward from the start of `text`, reusing `cache`
/// wherever a prior sub-computation's `start_state` still matches and its
/// `read_length` fits before `edit_bound` (an absolute byte offset; pass
/// `text.len()` when there is no pending edit to bound against).
///
/// When no combinator matches at a position, advances one rune and
/// retries without emitting anything (spec §4.8 "Error recovery").
/// Returns the token stream plus a freshly built cache reflecting exactly
/// what was (re)computed on this pass.
pub fn parse_incremental<'a, S>(
    parser: &Parser<'a, S>,
    text: &'a str,
    initial_state: S,
    cache: &CompTree<S>,
    edit_bound: usize,
) -> (Vec<ComputedToken>, CompTree<S>)
where
    S: Clone + PartialEq + 'a,
{
    let mut tokens = Vec::new();
    let mut fresh = CompTree::new();
    let mut state = initial_state;
    let mut byte_pos = 0usize;

    while byte_pos < text.len() {
        let max_read = edit_bound.saturating_sub(byte_pos);

        if let Some(cached) = cache.find_reusable(byte_pos, &state, max_read) {
            tokens.extend(cached.tokens.iter().map(|t| ComputedToken {
                offset: t.offset + byte_pos,
                ..*t
            }));
            state = cached.end_state.clone();
            byte_pos += cached.consumed_length;
            fresh.append(cached.clone());
            continue;
        }

        let iter = RuneIter::new(&text[byte_pos..]);
        match parser.run(iter.clone(), state.clone()) {
            Some(ParseOutcome {
                num_consumed,
                tokens: out_tokens,
                next_state,
            }) if num_consumed > 0 => {
                let consumed_length = iter.peek_str(num_consumed).len();
                let read_length = iter.max_read().max(consumed_length);
                tokens.extend(out_tokens.iter().map(|t| ComputedToken {
                    offset: t.offset + byte_pos,
                    ..*t
                }));
                fresh.append(CompNode {
                    consumed_length,
                    read_length,
                    start_state: state.clone(),
                    end_state: next_state.clone(),
                    tokens: out_tokens,
                });
                state = next_state;
                byte_pos += consumed_length;
            }
            _ => {
                let mut probe = iter;
                match probe.next() {
                    Some(_) => byte_pos += probe.byte_pos(),
                    None => break,
                }
            }
        }
    }

    (tokens, fresh)
}

/// Parse `text` from scratch, with no prior cache to reuse.
pub fn parse_full<'a, S>(parser: &Parser<'a, S>, text: &'a str, initial_state: S) -> (Vec<ComputedToken>, CompTree<S>)
where
    S: Clone + PartialEq + 'a,
{
    parse_incremental(parser, text, initial_state, &CompTree::new(), text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::combinators::{literal, ParseOutcome};
    use crate::token::TokenRole;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct NoState;

    fn word_or_skip<'a>() -> Parser<'a, NoState> {
        literal::<NoState>("foo")
            .map(|outcome| ParseOutcome {
                tokens: vec![ComputedToken {
                    offset: 0,
                    length: outcome.num_consumed,
                    role: TokenRole::WORD,
                }],
                ..outcome
            })
            .or(literal::<NoState>("bar").map(|outcome| ParseOutcome {
                tokens: vec![ComputedToken {
                    offset: 0,
                    length: outcome.num_consumed,
                    role: TokenRole::WORD,
                }],
                ..outcome
            }))
    }

    #[test]
    fn parses_whole_input_with_error_recovery_between_matches() {
        let parser = word_or_skip();
        let (tokens, tree) = parse_full(&parser, "foo bar", NoState);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 4);
        assert!(tree.total_consumed() > 0);
    }

    #[test]
    fn reuses_cached_node_when_state_and_bound_match() {
        let parser = word_or_skip();
        let (_, cache) = parse_full(&parser, "foo bar", NoState);
        let (tokens, _) = parse_incremental(&parser, "foo bar", NoState, &cache, usize::MAX);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn invalidate_drops_nodes_near_the_edit() {
        let parser = word_or_skip();
        let (_, mut cache) = parse_full(&parser, "foo bar", NoState);
        assert!(!cache.is_empty());
        cache.invalidate(4, 3); // the "bar" span
        assert!(cache.find_reusable(4, &NoState, usize::MAX).is_none());
        assert!(cache.find_reusable(0, &NoState, usize::MAX).is_some());
    }
}
