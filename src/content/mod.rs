//! Rich-text rendering for stored template markup.
//!
//! Descriptions and course instructions are stored with a [`TextFormat`]
//! code and may reference uploaded assets through the `@@ASSETS@@`
//! placeholder. The renderer resolves the placeholder against a
//! [`FileContext`] and produces presentation HTML for the stored format.

use crate::template::TextFormat;

/// Placeholder authors use in stored markup to reference the file area.
pub const ASSET_PLACEHOLDER: &str = "@@ASSETS@@";

/// Where asset placeholders in one piece of stored markup resolve to.
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Fully resolved base URL for the content's file area
    pub asset_base: String,
}

impl FileContext {
    /// File area for a template description.
    pub fn template_description(file_base_url: &str, template_id: i64) -> Self {
        Self {
            asset_base: format!(
                "{}/templates/{}/description",
                file_base_url.trim_end_matches('/'),
                template_id
            ),
        }
    }

    /// File area for a course's instruction text.
    pub fn course_instructions(file_base_url: &str, course_id: i64) -> Self {
        Self {
            asset_base: format!(
                "{}/courses/{}/instructions",
                file_base_url.trim_end_matches('/'),
                course_id
            ),
        }
    }
}

/// Renders stored markup into presentation HTML.
pub trait ContentRenderer: Send + Sync {
    /// Render body markup honoring its stored format. When `file_ctx` is
    /// given, asset placeholders are resolved first.
    fn render(&self, text: &str, format: TextFormat, file_ctx: Option<&FileContext>) -> String;

    /// Normalize a title for display: markup stripped, whitespace collapsed.
    fn render_title(&self, title: &str) -> String;
}

/// Default renderer.
///
/// - `Plain`: HTML-escapes and converts newlines to `<br />`
/// - `Html`: passes author-supplied HTML through unchanged
/// - `Markdown`: paragraphs, `**strong**`, `*emphasis*` and `` `code` ``
///   (the subset stored templates actually use)
pub struct HtmlContentRenderer;

impl HtmlContentRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlContentRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRenderer for HtmlContentRenderer {
    fn render(&self, text: &str, format: TextFormat, file_ctx: Option<&FileContext>) -> String {
        let body = match file_ctx {
            Some(ctx) => text.replace(ASSET_PLACEHOLDER, &ctx.asset_base),
            None => text.to_string(),
        };

        match format {
            TextFormat::Plain => escape_html(body.trim()).replace('\n', "<br />"),
            TextFormat::Html => body,
            TextFormat::Markdown => render_markdown(&body),
        }
    }

    fn render_title(&self, title: &str) -> String {
        let stripped = strip_markup(title);
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Escape the five HTML-significant characters.
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

/// Drop `<...>` tag spans, leaving a space where each tag sat so adjacent
/// words do not fuse.
fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn render_markdown(text: &str) -> String {
    let paragraphs: Vec<String> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let escaped = escape_html(p).replace('\n', "<br />");
            format!("<p>{}</p>", apply_inline(&escaped))
        })
        .collect();

    paragraphs.join("\n")
}

/// Inline markdown on already-escaped text. Backtick spans go first so
/// asterisks inside code stay literal.
fn apply_inline(escaped: &str) -> String {
    let s = replace_pairs(escaped, "`", "<code>", "</code>");
    let s = replace_pairs(&s, "**", "<strong>", "</strong>");
    replace_pairs(&s, "*", "<em>", "</em>")
}

/// Replace matched pairs of `marker` with `open`/`close`. An unpaired
/// trailing marker is left as literal text.
fn replace_pairs(text: &str, marker: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(marker) {
        let after = &rest[start + marker.len()..];
        match after.find(marker) {
            Some(end) => {
                out.push_str(&rest[..start]);
                out.push_str(open);
                out.push_str(&after[..end]);
                out.push_str(close);
                rest = &after[end + marker.len()..];
            }
            None => break,
        }
    }

    out.push_str(rest);
    out
}
