//! Reply formatting
//!
//! Text is HTML-escaped first, then four light markdown rules run in a fixed
//! order: `**strong**`, `*emphasis*`, `` `code` ``, newline. `***both***`
//! is matched ahead of strong so the tags nest. Code spans are lifted out
//! before the emphasis rules and put back afterwards, so asterisks inside
//! backticks are never turned into emphasis.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static STRONG_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*\*(.+?)\*\*\*").expect("Invalid strong emphasis regex"));

static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("Invalid strong regex"));

static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("Invalid emphasis regex"));

static CODE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("Invalid code span regex"));

static CODE_SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x00(\d+)\x00").expect("Invalid code slot regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

/// Escape the five HTML-significant characters
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Turn raw message text into safe display markup
pub fn format_message(text: &str) -> String {
    // NUL marks code slots below; it has no business in chat text
    let escaped = html_escape(&text.replace('\0', ""));

    let mut code_spans: Vec<String> = Vec::new();
    let lifted = CODE_SPAN.replace_all(&escaped, |caps: &Captures| {
        code_spans.push(caps[1].to_string());
        format!("\0{}\0", code_spans.len() - 1)
    });

    let formatted = STRONG_EMPHASIS.replace_all(&lifted, "<strong><em>$1</em></strong>");
    let formatted = STRONG.replace_all(&formatted, "<strong>$1</strong>");
    let formatted = EMPHASIS.replace_all(&formatted, "<em>$1</em>");

    let restored = CODE_SLOT.replace_all(&formatted, |caps: &Captures| {
        let code = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| code_spans.get(i))
            .map_or("", String::as_str);
        format!("<code>{code}</code>")
    });

    restored.replace('\n', "<br>")
}

/// Plain text of formatted markup, the way a browser's `innerText` reads it
pub fn plain_text(html: &str) -> String {
    let with_breaks = html.replace("<br>", "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
