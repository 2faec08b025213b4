//! # Value Search
//!
//! Finds a literal term (case-insensitive) in decoded secret values and
//! returns the matching lines with surrounding context.
//!
//! ## Merging
//!
//! Matches are walked in ascending order. Each match not yet absorbed seeds a
//! window of `context_lines` on either side. In one forward pass, every later
//! match within `context_lines` of the seed window's end is absorbed and moves
//! the window end to its own `+context_lines` boundary. The absorb threshold
//! stays anchored to the seed window, so a match chained further out starts a
//! new block even when it touches the extended window. Output formatting
//! relies on this exact block layout.
//!
//! Everything here is a pure function of its inputs.

use crate::secret::SecretSet;

/// One block of context around one or more matching lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchContext {
    /// 1-based line number of the match that seeded the block
    pub line_number: usize,
    /// The window's lines joined with `\n`
    pub context_text: String,
    /// 0-based indices, relative to `context_text`, of every matching line in the window
    pub match_line_indices: Vec<usize>,
}

/// Matches for one key of one secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub namespace: String,
    pub secret_name: String,
    pub key_name: String,
    pub matches: Vec<MatchContext>,
}

/// Ordinal, case-insensitive containment
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Find every line containing `term` and build merged context blocks
#[must_use]
pub fn find_matches_with_context(
    content: &str,
    term: &str,
    context_lines: usize,
) -> Vec<MatchContext> {
    if term.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let last_line = lines.len() - 1;

    let matched: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| contains_ignore_case(line, term))
        .map(|(i, _)| i)
        .collect();

    let mut absorbed = vec![false; lines.len()];
    let mut blocks = Vec::new();

    for &seed in &matched {
        if absorbed[seed] {
            continue;
        }
        absorbed[seed] = true;

        let start = seed.saturating_sub(context_lines);
        let seed_end = (seed + context_lines).min(last_line);
        let threshold = seed_end + context_lines;

        let mut end = seed_end;
        for &other in matched.iter().filter(|&&m| m > seed && m <= threshold) {
            end = (other + context_lines).min(last_line);
            absorbed[other] = true;
        }

        blocks.push(MatchContext {
            line_number: seed + 1,
            context_text: lines[start..=end].join("\n"),
            match_line_indices: matched
                .iter()
                .filter(|&&m| m >= start && m <= end)
                .map(|&m| m - start)
                .collect(),
        });
    }

    blocks
}

/// Search every key of every secret in the set
#[must_use]
pub fn search_secrets(set: &SecretSet, term: &str, context_lines: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();
    for entry in set {
        for secret in &entry.secrets {
            let matches = find_matches_with_context(&secret.value, term, context_lines);
            if !matches.is_empty() {
                results.push(SearchResult {
                    namespace: entry.key.namespace.clone(),
                    secret_name: entry.key.name.clone(),
                    key_name: secret.name.clone(),
                    matches,
                });
            }
        }
    }
    results
}
