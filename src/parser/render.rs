use std::sync::LazyLock;

use anyhow::Result;
use chrono::{DateTime, Local};
use regex::Regex;

use super::segment::Section;

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[.)]\s").unwrap());
static LETTERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][.)]\s").unwrap());

/// Render sections as a pretty-printed JSON object mapping title → body.
/// Key order is insertion order (serde_json's preserve_order feature).
pub fn to_json(sections: &[Section]) -> Result<String> {
    let mut map = serde_json::Map::new();
    for s in sections {
        map.insert(s.title.clone(), serde_json::Value::String(s.body.clone()));
    }
    Ok(serde_json::to_string_pretty(&serde_json::Value::Object(map))?)
}

/// Render sections as a human-readable Markdown document: one `##` heading
/// per section, list lines kept tight, paragraphs blank-line separated.
pub fn to_markdown(sections: &[Section], source: &str, extracted_at: DateTime<Local>) -> String {
    let mut md = format!(
        "# CBOA Rules Modifications\n\
         *Extracted on: {}*\n\
         *Source: {}*\n\n\
         Total sections: {}\n\n---\n\n",
        extracted_at.format("%Y-%m-%d %H:%M"),
        source,
        sections.len(),
    );

    for section in sections {
        md.push_str(&format!("## {}\n\n", section.title));
        for line in section.body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if NUMBERED_RE.is_match(line) {
                md.push_str(line);
                md.push('\n');
            } else if LETTERED_RE.is_match(line) {
                md.push_str("  ");
                md.push_str(line);
                md.push('\n');
            } else if line.starts_with('•') || line.starts_with("- ") {
                md.push_str(line);
                md.push('\n');
            } else {
                md.push_str(line);
                md.push_str("\n\n");
            }
        }
        md.push_str("\n---\n\n");
    }

    md
}
