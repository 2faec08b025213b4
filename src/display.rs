//! # Console Display
//!
//! Small formatting helpers shared by the commands. Colors are only emitted
//! when stdout supports them (`NO_COLOR` is honoured).

use crate::constants::BANNER_RULE_WIDTH;
use owo_colors::{OwoColorize, Stream::Stdout};

pub fn bold(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.bold()).to_string()
}

pub fn dim(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.dimmed()).to_string()
}

pub fn green(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.green()).to_string()
}

pub fn red(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.red()).to_string()
}

pub fn yellow(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.yellow()).to_string()
}

pub fn cyan(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.cyan()).to_string()
}

/// Bold yellow, used for the matched term in `find` output
pub fn highlight(text: &str) -> String {
    text.if_supports_color(Stdout, |t| t.bold().yellow().to_string())
        .to_string()
}

/// `=` rule framing banners
#[must_use]
pub fn rule() -> String {
    "=".repeat(BANNER_RULE_WIDTH)
}

/// Shorten to `max_len` characters by eliding the middle
#[must_use]
pub fn truncate_for_display(value: &str, max_len: usize) -> String {
    let len = value.chars().count();
    if len <= max_len {
        return value.to_string();
    }

    let half = max_len.saturating_sub(3) / 2;
    let head: String = value.chars().take(half).collect();
    let tail: String = value.chars().skip(len - half).collect();
    format!("{head}...{tail}")
}

/// Wrap every case-insensitive occurrence of `term` with `paint`, keeping the
/// original casing of the matched text
pub fn highlight_matches(line: &str, term: &str, paint: impl Fn(&str) -> String) -> String {
    let needle: Vec<char> = term.to_lowercase().chars().collect();
    if needle.is_empty() {
        return line.to_string();
    }

    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        let candidate: String = chars[i..]
            .iter()
            .take(term.chars().count())
            .map(|(_, c)| *c)
            .collect();
        if candidate.to_lowercase().chars().eq(needle.iter().copied()) {
            let end = i + candidate.chars().count();
            let from = chars[i].0;
            let to = chars.get(end).map_or(line.len(), |(b, _)| *b);
            out.push_str(&paint(&line[from..to]));
            i = end;
        } else {
            out.push(chars[i].1);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_value_unchanged() {
        assert_eq!(truncate_for_display("short", 60), "short");
        assert_eq!(truncate_for_display("", 10), "");
    }

    #[test]
    fn test_truncate_elides_middle() {
        let value = "abcdefghijklmnopqrstuvwxyz";
        // (10 - 3) / 2 = 3 characters kept on each side
        assert_eq!(truncate_for_display(value, 10), "abc...xyz");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let value = "æøåæøåæøåæøå";
        assert_eq!(truncate_for_display(value, 9), "æøå...æøå");
    }

    #[test]
    fn test_highlight_matches_case_insensitive() {
        let out = highlight_matches("Host=DB.prod; db=main", "db", |s| format!("[{s}]"));
        assert_eq!(out, "Host=[DB].prod; [db]=main");
    }

    #[test]
    fn test_highlight_without_match() {
        assert_eq!(highlight_matches("nothing here", "zzz", |s| format!("[{s}]")), "nothing here");
        assert_eq!(highlight_matches("text", "", |s| format!("[{s}]")), "text");
    }

    #[test]
    fn test_rule_width() {
        assert_eq!(rule().len(), 45);
    }
}
