//! Named Unicode category range tables, backed by `regex-syntax`'s class
//! data instead of vendoring UCD tables ourselves.

use regex_syntax::{
    hir::{Class, HirKind},
    ParserBuilder,
};

/// A sorted, non-overlapping, inclusive list of Unicode scalar value ranges.
///
/// `(lo, hi)` means every code point in `lo..=hi` is a member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeTable {
    ranges: Vec<(u32, u32)>,
}

impl RangeTable {
    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn contains(&self, cp: u32) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if cp < lo {
                    std::cmp::Ordering::Greater
                } else if cp > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub(crate) fn from_sorted(mut ranges: Vec<(u32, u32)>) -> Self {
        ranges.sort_unstable();
        // Merge adjacent/overlapping ranges so downstream UTF-8 trie
        // construction never has to reason about duplicates.
        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some((_, last_hi)) if lo <= last_hi.saturating_add(1) => {
                    *last_hi = (*last_hi).max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        RangeTable { ranges: merged }
    }
}

/// Error returned when a `\p{Name}` category is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported Unicode category `{0}`")]
pub struct UnknownCategory(pub String);

/// Look up a named Unicode category (`L`, `Nd`, `Lu`, `Lo`,
/// `Other_ID_Start`, …) and return its range table.
///
/// Implemented by asking `regex-syntax` to parse `\p{name}` and reading the
/// resulting [`Class::Unicode`] back out, the same parser the regex
/// compiler's host crate already links against for `(?i:...)` handling.
pub fn lookup(name: &str) -> Result<RangeTable, UnknownCategory> {
    let pattern = format!(r"\p{{{name}}}");
    let hir = ParserBuilder::new()
        .build()
        .parse(&pattern)
        .map_err(|_| UnknownCategory(name.to_string()))?;
    let class = match hir.kind() {
        HirKind::Class(Class::Unicode(class)) => class,
        _ => return Err(UnknownCategory(name.to_string())),
    };
    let ranges = class
        .ranges()
        .iter()
        .map(|r| (r.start() as u32, r.end() as u32))
        .collect();
    Ok(RangeTable::from_sorted(ranges))
}
