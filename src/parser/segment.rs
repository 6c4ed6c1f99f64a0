use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

/// Navigation and footer boilerplate on the CBOA resource centre site.
/// A body line containing any of these is discarded.
const DEFAULT_NOISE: &[&str] = &[
    "Home",
    "General Meetings",
    "CBOA Library",
    "Copyright",
    "Performance and Assessment",
    "Referee Development",
    "Member Services",
    "Self Assign",
    "Discord Setup",
];

/// League headers on the page all carry an "Updated <date>" suffix,
/// which is what distinguishes them from rule text.
pub const DEFAULT_MARKER: &str = "Updated";
pub const DEFAULT_MAX_HEADING_LEN: usize = 150;
pub const DEFAULT_MIN_BODY_LEN: usize = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("heading marker must not be empty")]
    EmptyMarker,
    #[error("max heading length must be greater than zero")]
    ZeroHeadingLen,
}

/// Tuning knobs for `segment`. The defaults match the CBOA
/// rules-modifications page; everything is overridable from the CLI.
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// A trimmed line containing this substring is a heading candidate.
    pub marker: String,
    /// Heading candidates at or above this char count are treated as body
    /// text (expanded dropdowns repeat the marker inside long rule lines).
    pub max_heading_len: usize,
    /// Body lines containing any of these substrings are dropped.
    pub noise_terms: Vec<String>,
    /// Sections whose joined body is shorter than this are dropped.
    pub min_body_len: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            max_heading_len: DEFAULT_MAX_HEADING_LEN,
            noise_terms: DEFAULT_NOISE.iter().map(|s| s.to_string()).collect(),
            min_body_len: DEFAULT_MIN_BODY_LEN,
        }
    }
}

impl SegmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marker.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        if self.max_heading_len == 0 {
            return Err(ConfigError::ZeroHeadingLen);
        }
        Ok(())
    }

    fn is_heading(&self, trimmed: &str) -> bool {
        !trimmed.is_empty()
            && trimmed.contains(self.marker.as_str())
            && trimmed.chars().count() < self.max_heading_len
    }

    fn is_noise(&self, trimmed: &str) -> bool {
        self.noise_terms.iter().any(|t| trimmed.contains(t.as_str()))
    }
}

/// A titled section: heading line plus the newline-joined body text
/// accumulated under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// Split a flat sequence of visible-text lines into titled sections.
///
/// Single linear pass. A heading starts a new section; non-noise,
/// non-empty lines accumulate under the current heading; content before
/// the first heading has no section to attach to and is discarded.
/// Sections whose body falls short of `min_body_len` chars are dropped.
/// A repeated title replaces the earlier body but keeps the position of
/// its first occurrence.
pub fn segment<'a, I>(lines: I, config: &SegmentConfig) -> Result<Vec<Section>, ConfigError>
where
    I: IntoIterator<Item = &'a str>,
{
    config.validate()?;

    let mut out: Vec<Section> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for raw in lines {
        let line = raw.trim();

        if config.is_heading(line) {
            if let Some((title, body)) = current.take() {
                commit(&mut out, &mut index, title, &body, config.min_body_len);
            }
            current = Some((line.to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            if !line.is_empty() && !config.is_noise(line) {
                body.push(line);
            }
        }
    }

    if let Some((title, body)) = current {
        commit(&mut out, &mut index, title, &body, config.min_body_len);
    }

    Ok(out)
}

fn commit(
    out: &mut Vec<Section>,
    index: &mut HashMap<String, usize>,
    title: String,
    body_lines: &[&str],
    min_body_len: usize,
) {
    let body = body_lines.join("\n");
    if body.chars().count() < min_body_len {
        return;
    }
    match index.get(&title) {
        Some(&i) => out[i].body = body,
        None => {
            index.insert(title.clone(), out.len());
            out.push(Section { title, body });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_body_len: usize) -> SegmentConfig {
        SegmentConfig {
            min_body_len,
            ..SegmentConfig::default()
        }
    }

    fn titles(sections: &[Section]) -> Vec<&str> {
        sections.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn empty_input() {
        let sections = segment([], &config(0)).unwrap();
        assert!(sections.is_empty());
    }

    #[test]
    fn no_headings() {
        let lines = ["just some text", "and more text", ""];
        let sections = segment(lines, &config(0)).unwrap();
        assert!(sections.is_empty());
    }

    #[test]
    fn basic_split() {
        let lines = [
            "League A (Updated Jan 1)",
            "rule one",
            "rule two",
            "League B (Updated Feb 2)",
            "rule three",
        ];
        let sections = segment(lines, &config(1)).unwrap();
        assert_eq!(titles(&sections), vec!["League A (Updated Jan 1)", "League B (Updated Feb 2)"]);
        assert_eq!(sections[0].body, "rule one\nrule two");
        assert_eq!(sections[1].body, "rule three");
    }

    #[test]
    fn pre_heading_content_discarded() {
        let lines = ["orphan line", "Header (Updated)", "body text here"];
        let sections = segment(lines, &config(1)).unwrap();
        assert_eq!(titles(&sections), vec!["Header (Updated)"]);
        assert!(!sections[0].body.contains("orphan"));
    }

    #[test]
    fn noise_lines_dropped() {
        let lines = [
            "Title (Updated)",
            "Rule one applies here",
            "Home",
            "Copyright 2024",
        ];
        let sections = segment(lines, &config(1)).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].body, "Rule one applies here");
    }

    #[test]
    fn whitespace_lines_contribute_nothing() {
        let lines = ["T (Updated)", "", "   ", "ab", "\t"];
        let sections = segment(lines, &config(2)).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].body, "ab");
    }

    #[test]
    fn threshold_boundary() {
        // Joined body is exactly 5 chars: "ab\ncd"
        let lines = ["T (Updated)", "ab", "cd"];
        let kept = segment(lines, &config(5)).unwrap();
        assert_eq!(kept.len(), 1);
        let dropped = segment(lines, &config(6)).unwrap();
        assert!(dropped.is_empty());
    }

    #[test]
    fn threshold_counts_chars_not_bytes() {
        let lines = ["T (Updated)", "ééé"];
        let sections = segment(lines, &config(3)).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(segment(lines, &config(4)).unwrap().is_empty());
    }

    #[test]
    fn duplicate_title_keeps_position_takes_last_body() {
        let lines = [
            "H: Updated",
            "line A long enough to pass threshold",
            "Other (Updated)",
            "middle body that is long enough too",
            "H: Updated",
            "line B long enough to pass threshold",
        ];
        let sections = segment(lines, &config(5)).unwrap();
        assert_eq!(titles(&sections), vec!["H: Updated", "Other (Updated)"]);
        assert_eq!(sections[0].body, "line B long enough to pass threshold");
    }

    #[test]
    fn back_to_back_headings_drop_the_empty_one() {
        let lines = ["First (Updated)", "Second (Updated)", "actual body text"];
        let sections = segment(lines, &config(5)).unwrap();
        assert_eq!(titles(&sections), vec!["Second (Updated)"]);
    }

    #[test]
    fn back_to_back_headings_kept_at_zero_threshold() {
        let lines = ["First (Updated)", "Second (Updated)", "body"];
        let sections = segment(lines, &config(0)).unwrap();
        assert_eq!(titles(&sections), vec!["First (Updated)", "Second (Updated)"]);
        assert_eq!(sections[0].body, "");
    }

    #[test]
    fn long_marker_line_is_body_not_heading() {
        let long = format!("{} {}", "x".repeat(160), "Updated");
        let lines = ["T (Updated)", long.as_str()];
        let sections = segment(lines, &config(1)).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].body, long.trim());
    }

    #[test]
    fn heading_exactly_at_max_len_is_body() {
        let mut cfg = config(1);
        cfg.max_heading_len = "T (Updated)".chars().count();
        let sections = segment(["T (Updated)", "body"], &cfg).unwrap();
        assert!(sections.is_empty());
    }

    #[test]
    fn empty_marker_rejected() {
        let cfg = SegmentConfig {
            marker: String::new(),
            ..SegmentConfig::default()
        };
        assert!(matches!(
            segment(["x"], &cfg),
            Err(ConfigError::EmptyMarker)
        ));
    }

    #[test]
    fn zero_max_heading_len_rejected() {
        let cfg = SegmentConfig {
            max_heading_len: 0,
            ..SegmentConfig::default()
        };
        assert!(matches!(
            segment(["x"], &cfg),
            Err(ConfigError::ZeroHeadingLen)
        ));
    }

    #[test]
    fn completeness_and_order() {
        let lines = [
            "A (Updated)",
            "first",
            "second",
            "B (Updated)",
            "third",
            "fourth",
            "fifth",
        ];
        let sections = segment(lines, &config(1)).unwrap();
        let all: Vec<&str> = sections
            .iter()
            .flat_map(|s| s.body.lines())
            .collect();
        assert_eq!(all, vec!["first", "second", "third", "fourth", "fifth"]);
    }

    #[test]
    fn resegmenting_output_is_idempotent() {
        let lines = [
            "League A (Updated Jan 1)",
            "rule one applies in all quarters",
            "rule two applies in overtime",
            "League B (Updated Feb 2)",
            "rule three governs timeouts here",
        ];
        let cfg = config(5);
        let first = segment(lines, &cfg).unwrap();

        let rebuilt: String = first
            .iter()
            .map(|s| format!("{}\n{}", s.title, s.body))
            .collect::<Vec<_>>()
            .join("\n");
        let second = segment(rebuilt.lines(), &cfg).unwrap();

        assert_eq!(first, second);
    }
}
