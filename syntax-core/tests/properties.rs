//! Property-based tests for the quantified invariants in spec §8
//! (coverage, idempotence, equivalence to a fresh full scan, longest-match
//! tie-break, lookahead bound) plus the token-tree edit/insert round trip.
//!
//! Documents are restricted to single-byte ASCII so rune positions and
//! byte positions coincide, matching how `SliceReader` is used throughout
//! the crate's own inline tests.

use proptest::prelude::*;

use syntax_core::regex::SliceReader;
use syntax_core::{Edit, Retokenizer, Rule, Token, TokenRole, TokenTree, Tokenizer};

fn sample_rules() -> Vec<Rule> {
    vec![
        Rule::builder("[A-Za-z][A-Za-z0-9]*".to_string())
            .role(TokenRole::IDENTIFIER)
            .build(),
        Rule::builder("[0-9]+".to_string())
            .role(TokenRole::NUMBER)
            .build(),
        Rule::builder(" +".to_string()).role(TokenRole::NONE).build(),
    ]
}

fn doc_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop_oneof![
        Just('a'), Just('b'), Just('c'),
        Just('1'), Just('2'),
        Just(' '), Just('+'), Just('-'),
    ], 0..40)
    .prop_map(|chars| chars.into_iter().collect())
}

fn assert_contiguous(tokens: &[Token], text_len: usize) {
    let mut pos = 0;
    for t in tokens {
        assert_eq!(t.start_pos, pos, "gap or overlap before this token");
        assert!(t.end_pos > pos, "zero-length token at {pos}");
        pos = t.end_pos;
    }
    assert_eq!(pos, text_len, "tokens don't reach end of text");
}

proptest! {
    /// Property 1: coverage. A fresh scan of any document covers
    /// `[0, text_length)` contiguously with no gaps or overlaps.
    #[test]
    fn coverage_is_contiguous(text in doc_text()) {
        let tokenizer = Tokenizer::compile(&sample_rules()).unwrap();
        let mut reader = SliceReader::new(text.as_bytes());
        let mut tree = tokenizer.tokenize_all(&mut reader, text.len()).unwrap();
        assert_contiguous(&tree.to_vec(), text.len());
    }

    /// Property 2: idempotence. A zero-length edit leaves the tree
    /// unchanged (role, positions, and lookahead all equal).
    #[test]
    fn zero_length_edit_is_idempotent(text in doc_text(), pos_frac in 0usize..=100) {
        let tokenizer = Tokenizer::compile(&sample_rules()).unwrap();
        let mut reader = SliceReader::new(text.as_bytes());
        let mut tree = tokenizer.tokenize_all(&mut reader, text.len()).unwrap();
        let before = tree.to_vec();

        let pos = (text.len() * pos_frac) / 100;
        let retok = Retokenizer::new(tokenizer);
        let edit = Edit { pos, num_inserted: 0, num_deleted: 0 };
        retok
            .apply_edit(&mut tree, edit, |p| SliceReader::at(text.as_bytes(), p), text.len())
            .unwrap();
        assert_eq!(tree.to_vec(), before);
    }

    /// Property 3 (the central correctness property): for a random single
    /// edit, the tree produced by incremental retokenization equals the
    /// tree produced by a fresh full scan of the edited text.
    #[test]
    fn incremental_matches_full_scan(
        text in doc_text(),
        pos_frac in 0usize..=100,
        num_deleted_frac in 0usize..=100,
        inserted in prop::collection::vec(prop_oneof![Just('x'), Just('9'), Just(' ')], 0..8),
    ) {
        let rules = sample_rules();
        let tokenizer = Tokenizer::compile(&rules).unwrap();
        let mut reader = SliceReader::new(text.as_bytes());
        let mut tree = tokenizer.tokenize_all(&mut reader, text.len()).unwrap();

        let pos = (text.len() * pos_frac) / 100;
        let num_deleted = ((text.len() - pos) * num_deleted_frac) / 100;
        let inserted: String = inserted.into_iter().collect();

        let mut after_text = String::new();
        after_text.push_str(&text[..pos]);
        after_text.push_str(&inserted);
        after_text.push_str(&text[pos + num_deleted..]);

        let retok = Retokenizer::new(tokenizer);
        let edit = Edit { pos, num_inserted: inserted.len(), num_deleted };
        retok
            .apply_edit(&mut tree, edit, |p| SliceReader::at(after_text.as_bytes(), p), after_text.len())
            .unwrap();
        let incremental = tree.to_vec();

        let tokenizer_fresh = Tokenizer::compile(&rules).unwrap();
        let mut fresh_reader = SliceReader::new(after_text.as_bytes());
        let mut fresh_tree = tokenizer_fresh
            .tokenize_all(&mut fresh_reader, after_text.len())
            .unwrap();
        let full_scan = fresh_tree.to_vec();

        assert_eq!(incremental, full_scan);
    }

    /// Property 5: longest match, ties resolved to the lowest rule index.
    /// Two identical-pattern rules at different positions in the table;
    /// the declared-first rule's role always wins the tie.
    #[test]
    fn longest_match_ties_go_to_lowest_rule_index(word in "[a-c]{1,6}") {
        let rules = vec![
            Rule::builder(word.clone()).role(TokenRole::KEYWORD).build(),
            Rule::builder(word.clone()).role(TokenRole::IDENTIFIER).build(),
        ];
        let tokenizer = Tokenizer::compile(&rules).unwrap();
        let mut reader = SliceReader::new(word.as_bytes());
        let tokens = tokenizer.scan(&mut reader, 0, word.len()).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].role, TokenRole::KEYWORD);
        assert_eq!(tokens[0].end_pos, word.len());
    }

    /// Property 6: lookahead bound. An edit at `e` can only change tokens
    /// whose pre-edit `lookahead_pos >= e`; every pre-edit token entirely
    /// before `e` with `lookahead_pos <= e` must reappear unchanged as a
    /// prefix of the post-edit token stream.
    #[test]
    fn edit_does_not_disturb_tokens_whose_lookahead_is_before_it(
        text in doc_text(),
        pos_frac in 0usize..=100,
        inserted in prop::collection::vec(prop_oneof![Just('x'), Just('9')], 0..8),
    ) {
        let rules = sample_rules();
        let tokenizer = Tokenizer::compile(&rules).unwrap();
        let mut reader = SliceReader::new(text.as_bytes());
        let mut tree = tokenizer.tokenize_all(&mut reader, text.len()).unwrap();
        let before = tree.to_vec();

        let pos = (text.len() * pos_frac) / 100;
        let inserted: String = inserted.into_iter().collect();
        let mut after_text = String::new();
        after_text.push_str(&text[..pos]);
        after_text.push_str(&inserted);
        after_text.push_str(&text[pos..]);

        let untouched: Vec<Token> = before
            .iter()
            .copied()
            .take_while(|t| t.lookahead_pos <= pos)
            .collect();

        let retok = Retokenizer::new(tokenizer);
        let edit = Edit { pos, num_inserted: inserted.len(), num_deleted: 0 };
        retok
            .apply_edit(&mut tree, edit, |p| SliceReader::at(after_text.as_bytes(), p), after_text.len())
            .unwrap();
        let after = tree.to_vec();

        assert_eq!(&after[..untouched.len()], &untouched[..]);
    }

    /// Algebraic law: deleting a span and inserting the same tokens back
    /// at the same position returns the tree to its original token set
    /// over that span.
    #[test]
    fn delete_then_insert_round_trips(
        left_len in 1usize..10,
        mid_len in 1usize..10,
        right_len in 1usize..10,
    ) {
        let mut tokens = Vec::new();
        let mut pos = 0;
        for _ in 0..left_len {
            tokens.push(Token::new(TokenRole::WORD, pos, pos + 1, pos + 1));
            pos += 1;
        }
        let mid_start = pos;
        let mid_token = Token::new(TokenRole::IDENTIFIER, pos, pos + mid_len, pos + mid_len);
        tokens.push(mid_token);
        pos += mid_len;
        let mid_end = pos;
        for _ in 0..right_len {
            tokens.push(Token::new(TokenRole::NUMBER, pos, pos + 1, pos + 1));
            pos += 1;
        }

        let mut tree = TokenTree::build_from_sorted(tokens.clone());
        let before = tree.to_vec();

        tree.delete_range(mid_start, mid_end);
        // `insert_token` places a token at its given start_pos without
        // shifting anything after it — the caller is expected to have
        // already made room. `delete_range` just closed that room up, so
        // widen it back out first.
        tree.shift_positions_after(mid_start - 1, mid_len as i64);
        tree.insert_token(mid_token);

        assert_eq!(tree.to_vec(), before);
    }
}
