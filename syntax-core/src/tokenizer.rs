//! Rule table → combined DFA, top-level scan and recursive sub-rule scan
//! (spec §3 "Tokenizer (C5)", §4.5).

use bon::Builder;

use crate::error::{RuleCompileError, ScanError};
use crate::regex::dfa::{match_longest, Dfa};
use crate::regex::nfa::Nfa;
use crate::regex::parser::{self, utf8_len};
use crate::regex::reader::TextReader;
use crate::token::{Token, TokenRole};
use crate::token_tree::TokenTree;

/// One entry in a rule table (spec §3 "rule table": `{regex, role,
/// optional sub-rules}`).
#[derive(Builder, Clone)]
pub struct Rule {
    #[builder(start_fn)]
    pub pattern: String,
    pub role: TokenRole,
    #[builder(default)]
    pub sub_rules: Vec<Rule>,
}

#[derive(Debug)]
struct CompiledRule {
    role: TokenRole,
    sub_tokenizer: Option<Tokenizer>,
}

/// A compiled rule table: one combined DFA plus, for any rule with
/// sub-rules, a nested [`Tokenizer`] for its span.
///
/// Immutable once built; safe to share across documents (spec §5).
#[derive(Debug)]
pub struct Tokenizer {
    dfa: Dfa,
    rules: Vec<CompiledRule>,
}

impl Tokenizer {
    /// Compile every rule's pattern through C1→C2→C3 and union the results
    /// into one DFA, tagging each rule's accept states with its index as
    /// the accept action (spec §4.5). Fails on the first unparseable
    /// pattern, wrapping the regex error with its rule index.
    pub fn compile(rules: &[Rule]) -> Result<Tokenizer, RuleCompileError> {
        let mut nfas = Vec::with_capacity(rules.len());
        let mut compiled = Vec::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            let ast = parser::parse(&rule.pattern).map_err(|source| RuleCompileError {
                rule_index: i,
                source,
            })?;
            let mut nfa = Nfa::compile(&ast);
            nfa.set_accept_action(i as u32);
            nfas.push(nfa);

            let sub_tokenizer = if rule.sub_rules.is_empty() {
                None
            } else {
                Some(Tokenizer::compile(&rule.sub_rules)?)
            };
            compiled.push(CompiledRule {
                role: rule.role,
                sub_tokenizer,
            });
        }
        let combined = Nfa::union_many(nfas);
        let dfa = Dfa::from_nfa(&combined);
        Ok(Tokenizer { dfa, rules: compiled })
    }

    /// Scan `[start_pos, text_length)` rune positions from `reader`
    /// (already positioned at the byte offset corresponding to
    /// `start_pos`), producing a contiguous, gapless token run.
    ///
    /// Error-recovery runs (consecutive unmatched runes) are merged into a
    /// single `None`-role token, as spec §4.5 requires.
    pub fn scan<R: TextReader>(
        &self,
        reader: &mut R,
        start_pos: usize,
        text_length: usize,
    ) -> Result<Vec<Token>, ScanError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut pos = start_pos;

        while pos < text_length {
            let step = self.scan_step(reader, pos, text_length)?;
            if step.is_empty() {
                break;
            }
            pos = step.last().unwrap().end_pos;
            for t in step {
                merge_push(&mut tokens, t);
            }
        }

        Ok(tokens)
    }

    /// Scan a single top-level rule match (or, failing that, one
    /// error-recovery rune) starting at `pos`. Exposed separately from
    /// [`Tokenizer::scan`] so the retokenizer can compare against the
    /// existing token run as it goes, instead of eagerly rescanning to
    /// `text_length` before checking for convergence (spec §4.7).
    ///
    /// Returns one or more tokens (more than one only when a matched
    /// rule recurses into a sub-tokenizer), or an empty vec only at
    /// `pos >= text_length`.
    pub fn scan_step<R: TextReader>(
        &self,
        reader: &mut R,
        pos: usize,
        text_length: usize,
    ) -> Result<Vec<Token>, ScanError> {
        if pos >= text_length {
            return Ok(Vec::new());
        }

        let result = match_longest(&self.dfa, reader, pos, text_length)?;
        if result.accepted && result.end_pos > pos {
            let rule_index = *result
                .accept_actions
                .iter()
                .min()
                .expect("match_longest only sets `accepted` when accept_actions is non-empty")
                as usize;
            let rule = &self.rules[rule_index];
            let lookahead = result.lookahead_pos;

            return Ok(if let Some(sub) = &rule.sub_tokenizer {
                reader.seek_backward(result.bytes_read_at_last_accept)?;
                let mut inner = sub.scan(reader, pos, result.end_pos)?;
                for t in &mut inner {
                    if t.role.is_none() {
                        t.role = rule.role;
                    }
                    t.lookahead_pos = t.lookahead_pos.min(lookahead);
                }
                inner
            } else {
                vec![Token::new(rule.role, pos, result.end_pos, lookahead)]
            });
        }

        // No accept, or an empty accept at the zero-width positions the
        // spec's Open Question resolution forbids as real tokens: advance
        // one rune and emit a length-one error-recovery token; adjacent
        // runs are merged by the caller.
        advance_one_rune(reader)?;
        Ok(vec![Token::new(TokenRole::NONE, pos, pos + 1, pos + 1)])
    }

    /// Full tokenization of a freshly opened document (spec §6.3 "Initial
    /// scan"). `text_length` is the document's length in runes.
    pub fn tokenize_all<R: TextReader>(
        &self,
        reader: &mut R,
        text_length: usize,
    ) -> Result<TokenTree, ScanError> {
        let tokens = self.scan(reader, 0, text_length)?;
        Ok(TokenTree::build_from_sorted(tokens))
    }
}

/// Append `t` to `tokens`, merging it into the previous entry when both
/// are adjacent `None`-role error-recovery spans (spec §4.5: "adjacent
/// error tokens are merged into a single run").
pub(crate) fn merge_push(tokens: &mut Vec<Token>, t: Token) {
    if let Some(last) = tokens.last_mut() {
        if last.role.is_none() && t.role.is_none() && last.end_pos == t.start_pos {
            last.end_pos = t.end_pos;
            last.lookahead_pos = last.lookahead_pos.max(t.lookahead_pos);
            return;
        }
    }
    tokens.push(t);
}

/// Consume exactly one rune's worth of bytes from `reader`. Only called
/// with `pos < text_length`, so reaching end of text here means the
/// caller's `text_length` overstated the reader's actual content.
fn advance_one_rune<R: TextReader + ?Sized>(reader: &mut R) -> Result<(), ScanError> {
    let mut lead = [0u8; 1];
    if reader.read(&mut lead)? == 0 {
        return Err(ScanError::InvalidUtf8 { at: 0 });
    }
    let len = utf8_len(lead[0]).unwrap_or(1);
    for _ in 1..len {
        let mut byte = [0u8; 1];
        if reader.read(&mut byte)? == 0 {
            return Err(ScanError::InvalidUtf8 { at: 0 });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::reader::SliceReader;

    fn rule(pattern: &str, role: TokenRole) -> Rule {
        Rule::builder(pattern.to_string()).role(role).build()
    }

    #[test]
    fn s1_longest_match_with_tie() {
        let rules = vec![
            rule("ab", TokenRole::KEYWORD),
            rule("abc", TokenRole::IDENTIFIER),
        ];
        let tokenizer = Tokenizer::compile(&rules).unwrap();
        let mut reader = SliceReader::new(b"abcd");
        let tokens = tokenizer.scan(&mut reader, 0, 4).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::new(TokenRole::IDENTIFIER, 0, 3, 3));
        assert_eq!(tokens[1].role, TokenRole::NONE);
        assert_eq!((tokens[1].start_pos, tokens[1].end_pos), (3, 4));
    }

    #[test]
    fn s2_anchors() {
        let rules = vec![rule("^a|a$", TokenRole::OPERATOR)];
        let tokenizer = Tokenizer::compile(&rules).unwrap();
        let mut reader = SliceReader::new(b"aba");
        let tokens = tokenizer.scan(&mut reader, 0, 3).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::new(TokenRole::OPERATOR, 0, 1, 1));
        assert_eq!(tokens[1].role, TokenRole::NONE);
        assert_eq!(tokens[2], Token::new(TokenRole::OPERATOR, 2, 3, 3));
    }

    #[test]
    fn covers_buffer_contiguously() {
        let rules = vec![rule("[A-Za-z_][A-Za-z0-9_]*", TokenRole::IDENTIFIER)];
        let tokenizer = Tokenizer::compile(&rules).unwrap();
        let text = b"foo 1 bar";
        let mut reader = SliceReader::new(text);
        let tokens = tokenizer.scan(&mut reader, 0, text.len()).unwrap();
        let mut pos = 0;
        for t in &tokens {
            assert_eq!(t.start_pos, pos);
            pos = t.end_pos;
        }
        assert_eq!(pos, text.len());
    }

    #[test]
    fn sub_rules_reassign_none_spans_and_clamp_lookahead() {
        let string_body = rule(r#"[^"]*"#, TokenRole::STRING);
        let string_rule = Rule::builder(r#""[^"]*""#.to_string())
            .role(TokenRole::STRING)
            .sub_rules(vec![string_body])
            .build();
        let tokenizer = Tokenizer::compile(&[string_rule]).unwrap();
        let text = br#""abc""#;
        let mut reader = SliceReader::new(text);
        let tokens = tokenizer.scan(&mut reader, 0, text.len()).unwrap();
        // The outer match is `"abc"`; the inner sub-tokenizer sees the
        // quotes as unmatched (None) spans that get reassigned to String.
        assert!(tokens.iter().all(|t| t.role == TokenRole::STRING));
        assert_eq!(tokens.first().unwrap().start_pos, 0);
        assert_eq!(tokens.last().unwrap().end_pos, text.len());
    }

    #[test]
    fn rule_compile_error_carries_rule_index() {
        let rules = vec![rule("a", TokenRole::WORD), rule("(unterminated", TokenRole::WORD)];
        let err = Tokenizer::compile(&rules).unwrap_err();
        assert_eq!(err.rule_index, 1);
    }
}
