use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

pub const DEFAULT_URL: &str =
    "https://sites.google.com/view/cboa-resource-centre/cboa-scheduler-updates/rules-modifications";

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").unwrap());
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|section|article|ul|ol|table)>").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Fetch a page and reduce it to flat visible text, one line per block.
///
/// No retries and no rendering: collapsed site content that only exists
/// after a browser expands it must come in through `import` instead.
pub async fn page_text(url: &str) -> Result<String> {
    let client = reqwest::Client::new();

    info!("Fetching {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("GET {} returned {}", url, status);
    }

    let html = response.text().await.context("Failed to read response body")?;
    let text = html_to_text(&html);
    info!("Extracted {} lines of visible text", text.lines().count());
    Ok(text)
}

/// Strip an HTML document down to its visible text. Block boundaries
/// become newlines so the segmenter sees one logical line per element.
pub fn html_to_text(html: &str) -> String {
    let cleaned = SCRIPT_RE.replace_all(html, "");
    let cleaned = STYLE_RE.replace_all(&cleaned, "");
    let cleaned = COMMENT_RE.replace_all(&cleaned, "");
    let cleaned = BREAK_RE.replace_all(&cleaned, "\n");
    let cleaned = TAG_RE.replace_all(&cleaned, "");
    let decoded = decode_entities(&cleaned);

    let joined = decoded
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    BLANKS_RE.replace_all(&joined, "\n\n").trim().to_string()
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_text() {
        let html = "<html><body><p>Senior League (Updated)</p><p>1. Rule one.</p></body></html>";
        assert_eq!(html_to_text(html), "Senior League (Updated)\n1. Rule one.");
    }

    #[test]
    fn drops_scripts_and_styles() {
        let html = "<style>p { color: red }</style><script>var x = 'Updated';</script><p>real text</p>";
        assert_eq!(html_to_text(html), "real text");
    }

    #[test]
    fn drops_comments() {
        let html = "<p>before</p><!-- hidden Updated note --><p>after</p>";
        assert_eq!(html_to_text(html), "before\nafter");
    }

    #[test]
    fn br_becomes_newline() {
        let html = "line one<br>line two<br/>line three";
        assert_eq!(html_to_text(html), "line one\nline two\nline three");
    }

    #[test]
    fn entities_decoded() {
        let html = "<p>Tigers &amp; Bears &#39;24 &lt;finals&gt;</p>";
        assert_eq!(html_to_text(html), "Tigers & Bears '24 <finals>");
    }

    #[test]
    fn blank_runs_collapsed() {
        let html = "<div>a</div>\n\n\n\n<div>b</div>";
        assert_eq!(html_to_text(html), "a\n\nb");
    }
}
