//! Incremental retokenizer (spec §3 "Incremental retokenizer (C7)", §4.7):
//! shift the tree to match the edited text, restart the DFA scan at the
//! leftmost affected token, and stop rewriting as soon as a run of freshly
//! scanned tokens matches what was already there.

use std::ops::Range;

use log::trace;

use crate::error::ScanError;
use crate::regex::reader::TextReader;
use crate::token::Token;
use crate::token_tree::TokenTree;
use crate::tokenizer::{merge_push, Tokenizer};

/// A single edit to the underlying text, in rune positions (spec §4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edit {
    pub pos: usize,
    pub num_inserted: usize,
    pub num_deleted: usize,
}

/// How many consecutive matching tokens end a rescan (spec §4.7: "the
/// intended batch size"). Small because a mismatch anywhere in the batch
/// restarts the comparison from scratch at the next token, so a short run
/// converges about as fast as a long one while bounding wasted rescanning
/// on a genuine mismatch at the very end of the document.
const CONVERGENCE_BATCH: usize = 8;

/// Ties a [`Tokenizer`] to one document's [`TokenTree`], applying edits
/// incrementally (spec §4.7).
pub struct Retokenizer {
    tokenizer: Tokenizer,
}

impl Retokenizer {
    pub fn new(tokenizer: Tokenizer) -> Retokenizer {
        Retokenizer { tokenizer }
    }

    /// Apply `edit` to `tree`, which must already reflect the pre-edit
    /// text. `reader_at_pos(p)` must return a reader positioned at the
    /// byte offset corresponding to post-edit rune position `p`.
    /// `text_length_after` is the new total document length in runes.
    ///
    /// Returns the `[p0, p_stop)` range that was rewritten, for repaint
    /// hinting (spec §6.3). Never partially mutates `tree` on a reader
    /// error: the edit-shift from step 1 either is or isn't the only
    /// mutation applied (spec §7).
    pub fn apply_edit<R: TextReader>(
        &self,
        tree: &mut TokenTree,
        edit: Edit,
        mut reader_at_pos: impl FnMut(usize) -> R,
        text_length_after: usize,
    ) -> Result<Range<usize>, ScanError> {
        // Step 1: apply the edit to positions so the tree matches the
        // edited text before any rescanning happens. Deletion first, then
        // insertion — `delete_range` already shifts everything after it
        // left, so the tree's positions are consistent by the time
        // `extend_token_intersecting`/`insert_token` reasons about
        // `edit.pos` (a combined replace edit otherwise mixes pre- and
        // post-shift coordinates).
        if edit.num_deleted > 0 {
            tree.delete_range(edit.pos, edit.pos + edit.num_deleted);
        }
        if edit.num_inserted > 0 {
            if edit.pos == tree.text_length() {
                tree.insert_token(Token::new(
                    crate::token::TokenRole::NONE,
                    edit.pos,
                    edit.pos + edit.num_inserted,
                    edit.pos + edit.num_inserted,
                ));
            } else {
                tree.extend_token_intersecting(edit.pos, edit.num_inserted);
            }
        }

        // Step 2: restart at the leftmost token whose lookahead reached
        // the edit position.
        let p0: Vec<Token> = tree.iter_from_first_affected(edit.pos).collect();
        let p0_pos = p0.first().map_or(edit.pos, |t| t.start_pos);
        trace!("retokenize: edit={:?} restart at {}", edit, p0_pos);

        // Step 3: rescan from p0 one top-level step at a time — not a
        // single eager `scan` to `text_length_after` — so a converging
        // comparison can stop the rescan well short of end-of-text (spec
        // §4.7: "typical case ... O(lookahead) after the edit").
        let mut reader = reader_at_pos(p0_pos);
        let edit_end = edit.pos + edit.num_inserted;
        let mut pos = p0_pos;
        let mut fresh: Vec<Token> = Vec::new();
        let mut existing_iter = p0.into_iter().peekable();
        let mut run = 0usize;
        let mut p_stop = text_length_after;

        'scan: loop {
            if pos >= text_length_after {
                p_stop = text_length_after;
                break;
            }
            let step = self.tokenizer.scan_step(&mut reader, pos, text_length_after)?;
            if step.is_empty() {
                p_stop = text_length_after;
                break;
            }
            for t in step {
                pos = t.end_pos;
                merge_push(&mut fresh, t);

                // Compared against the unmerged step token: a match inside
                // a multi-rune error-recovery run won't register until the
                // run ends, which only costs a few extra steps of rescan.
                if t.start_pos > edit_end {
                    let matches_existing = loop {
                        match existing_iter.peek() {
                            Some(e) if e.start_pos < t.start_pos => {
                                existing_iter.next();
                            }
                            Some(e) => break *e == t,
                            None => break false,
                        }
                    };
                    if matches_existing {
                        existing_iter.next();
                        run += 1;
                        if run >= CONVERGENCE_BATCH {
                            p_stop = pos;
                            break 'scan;
                        }
                    } else {
                        run = 0;
                    }
                }
            }
        }

        // Step 4: rewrite [p0, p_stop) with the freshly scanned tokens.
        // `fresh` may run past `p_stop` (the converging batch itself);
        // trim to exactly the rewritten span. `rewrite_range`, not
        // `delete_range`: positions at and after `p_stop` are already
        // correct (that's what "converged" means) and must not shift.
        fresh.retain(|t| t.start_pos < p_stop);
        tree.rewrite_range(p0_pos, p_stop, fresh);

        Ok(p0_pos..p_stop)
    }
}
