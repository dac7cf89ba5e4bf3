//! Caption sanitization: link and mention removal plus template rendering.
//!
//! Pure functions, deterministic, no I/O. Removal is best-effort: malformed
//! input never panics, it just cleans what the patterns recognize.

use std::sync::LazyLock;

use regex::Regex;

/// URL-like substrings: scheme URLs, Telegram deep links, `www.` hosts, and
/// bare domains on common TLDs (with an optional path).
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)(?:https?://\S+|(?:t\.me|telegram\.me)/\S+|www\.\S+|\b[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.(?:com|net|org|io|co|me|gg|tv|app|dev|xyz|info|link|site|online|store|club)\b(?:/\S*)?)",
    )
});

/// `@mention` handles.
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"@[A-Za-z0-9_]{2,32}"));

// Patterns are compile-time constants; failing to compile one is a
// programmer error, not a runtime condition.
#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

/// Whether `text` contains anything [`LINK_RE`] recognizes as a link.
#[must_use]
pub fn contains_link(text: &str) -> bool {
    LINK_RE.is_match(text)
}

/// Remove links and mentions from `raw`, collapsing the whitespace left
/// behind. Returns the cleaned text and the number of links removed.
///
/// Idempotent: cleaning already-clean text is the identity.
#[must_use]
pub fn strip_links_and_mentions(raw: &str) -> (String, usize) {
    let removed = LINK_RE.find_iter(raw).count();
    let stripped = LINK_RE.replace_all(raw, "");
    let stripped = MENTION_RE.replace_all(&stripped, "");
    (collapse_whitespace(&stripped), removed)
}

/// Collapse runs of blanks within each line and drop lines left empty.
fn collapse_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}

/// Render the caption template. `{caption}` is replaced with the cleaned
/// caption, `{source}` with the source channel handle. An empty template is
/// the identity function; a rendering that is all whitespace collapses to
/// the empty string.
#[must_use]
pub fn apply_template(template: &str, caption: &str, source: Option<&str>) -> String {
    if template.is_empty() {
        return caption.trim().to_string();
    }
    let rendered = template
        .replace("{caption}", caption)
        .replace("{source}", source.unwrap_or("source"));
    let rendered = collapse_whitespace(&rendered);
    rendered.trim().to_string()
}

/// Sanitize a raw caption and render it through the template in one step.
/// Returns the final caption and the number of links removed.
#[must_use]
pub fn clean_caption(raw: &str, template: &str, source: Option<&str>) -> (String, usize) {
    let (stripped, removed) = strip_links_and_mentions(raw);
    (apply_template(template, &stripped, source), removed)
}
