//! Just enough Markdown for job descriptions scraped from boards that
//! return `**bold**`, `_italic_` and `# headings`.

use std::sync::OnceLock;

use regex::Regex;

struct Rules {
    heading: Regex,
    bold_stars: Regex,
    bold_underscores: Regex,
    italic_star: Regex,
    italic_underscore: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        heading: Regex::new(r"(?m)^#+[ \t]*(.+?)[ \t]*$").expect("valid regex"),
        bold_stars: Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"),
        bold_underscores: Regex::new(r"__(.+?)__").expect("valid regex"),
        italic_star: Regex::new(r"\*(.+?)\*").expect("valid regex"),
        italic_underscore: Regex::new(r"\b_(.+?)_\b").expect("valid regex"),
    })
}

/// Escapes text for an HTML body or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Escapes `text`, then renders headings and bold as `<strong>`, italics as
/// `<em>`, and newlines as `<br>`.
pub fn markdown_to_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let rules = rules();

    let text = text
        .replace("\\-", "-")
        .replace("\\*", "*")
        .replace("\\_", "_")
        .replace("\r\n", "\n");
    let text = escape_html(&text);

    let text = rules.heading.replace_all(&text, "<strong>$1</strong>");
    let text = rules.bold_stars.replace_all(&text, "<strong>$1</strong>");
    let text = rules.bold_underscores.replace_all(&text, "<strong>$1</strong>");
    let text = rules.italic_star.replace_all(&text, "<em>$1</em>");
    let text = rules.italic_underscore.replace_all(&text, "<em>$1</em>");

    text.replace('\n', "<br>")
}
