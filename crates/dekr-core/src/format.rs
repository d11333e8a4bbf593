//! Raw message text to display markup.
//!
//! [`format_message`] escapes the input first, then applies a small
//! markdown-like dialect: `**strong**`, `*em*`, `` `code` ``, line breaks,
//! bare `http(s)` links and simple ordered/unordered lists.
//!
//! Only the first contiguous run of ordered lines and the first contiguous
//! run of bullet lines become lists; later runs are kept as plain lines.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static STRONG: Lazy<Regex> = Lazy::new(|| compile(r"\*\*(.+?)\*\*"));
static EMPHASIS: Lazy<Regex> = Lazy::new(|| compile(r"\*(.+?)\*"));
static CODE: Lazy<Regex> = Lazy::new(|| compile(r"`(.+?)`"));
// Escaping has already turned every raw `<` into `&lt;`, so a literal `<`
// here can only be markup produced by an earlier step.
static URL: Lazy<Regex> = Lazy::new(|| compile(r"https?://[^\s<]+"));
static ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| compile(r"^\d+\.\s+(.+)$"));
static BULLET_ITEM: Lazy<Regex> = Lazy::new(|| compile(r"^[•\-]\s+(.+)$"));

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("invalid built-in pattern {pattern:?}: {err}"),
    }
}

/// Converts raw message text into a sanitized markup fragment.
///
/// Pure and deterministic. Empty input yields an empty fragment and
/// whitespace-only input is returned unchanged.
pub fn format_message(raw: &str) -> String {
    if raw.trim().is_empty() {
        return raw.to_string();
    }

    let escaped = escape(raw);
    let styled = apply_inline(&escaped);
    let linked = link_urls(&styled);
    assemble_lines(&linked)
}

/// Escapes `& < > " '` so no input fragment can open markup or break out of
/// an attribute value.
pub fn escape(raw: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(raw)
}

fn apply_inline(text: &str) -> String {
    let text = STRONG.replace_all(text, "<strong>$1</strong>");
    let text = EMPHASIS.replace_all(&text, "<em>$1</em>");
    CODE.replace_all(&text, "<code>$1</code>").into_owned()
}

fn link_urls(text: &str) -> String {
    URL.replace_all(
        text,
        r#"<a href="$0" target="_blank" rel="noopener noreferrer">$0</a>"#,
    )
    .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Bullet,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Ordered => "ol",
            ListKind::Bullet => "ul",
        }
    }

    fn item(self, line: &str) -> Option<&str> {
        let pattern = match self {
            ListKind::Ordered => &ORDERED_ITEM,
            ListKind::Bullet => &BULLET_ITEM,
        };
        pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

enum Block<'a> {
    Line(&'a str),
    List(ListKind, Vec<&'a str>),
}

/// Joins lines with `<br>` and folds the first run of each list kind into a
/// list element. A list element replaces the line breaks around it.
fn assemble_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();

    let mut blocks: Vec<Block<'_>> = Vec::new();
    let mut converted_ordered = false;
    let mut converted_bullet = false;
    let mut i = 0;

    while i < lines.len() {
        let mut matched = None;
        for (kind, done) in [
            (ListKind::Ordered, converted_ordered),
            (ListKind::Bullet, converted_bullet),
        ] {
            if !done && kind.item(lines[i]).is_some() {
                matched = Some(kind);
                break;
            }
        }

        let Some(kind) = matched else {
            blocks.push(Block::Line(lines[i]));
            i += 1;
            continue;
        };

        let mut items = Vec::new();
        while let Some(item) = lines.get(i).and_then(|line| kind.item(line)) {
            items.push(item);
            i += 1;
        }
        match kind {
            ListKind::Ordered => converted_ordered = true,
            ListKind::Bullet => converted_bullet = true,
        }
        blocks.push(Block::List(kind, items));
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut previous_was_line = false;
    for block in blocks {
        match block {
            Block::Line(line) => {
                if previous_was_line {
                    out.push_str("<br>");
                }
                out.push_str(line);
                previous_was_line = true;
            }
            Block::List(kind, items) => {
                out.push('<');
                out.push_str(kind.tag());
                out.push('>');
                for item in items {
                    out.push_str("<li>");
                    out.push_str(item);
                    out.push_str("</li>");
                }
                out.push_str("</");
                out.push_str(kind.tag());
                out.push('>');
                previous_was_line = false;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(format_message(""), "");
        assert_eq!(format_message("   "), "   ");
        assert_eq!(format_message("\n\n"), "\n\n");
    }

    #[test]
    fn test_escapes_markup_before_styling() {
        let out = format_message("<script>alert('x')</script>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains('\''));
    }

    #[test]
    fn test_no_raw_markup_survives() {
        let inputs = [
            "a < b > c",
            "**<b>bold</b>**",
            "`<img src=x onerror=alert(1)>`",
            "\"quoted\" & 'single'",
            "https://evil.example/\"onmouseover=\"x",
            "1. <i>item</i>\n2. second",
        ];
        for input in inputs {
            let out = format_message(input);
            let stripped = strip_generated_tags(&out);
            assert!(!stripped.contains('<'), "raw '<' leaked for {input:?}: {out}");
            assert!(!stripped.contains('>'), "raw '>' leaked for {input:?}: {out}");
            assert!(!stripped.contains('"'), "raw '\"' leaked for {input:?}: {out}");
        }
    }

    /// Removes the tags the formatter itself emits, leaving only text content.
    fn strip_generated_tags(markup: &str) -> String {
        let tags = Regex::new(
            r#"</?(strong|em|code|ol|ul|li)>|<br>|<a href="[^"]*" target="_blank" rel="noopener noreferrer">|</a>"#,
        )
        .unwrap();
        tags.replace_all(markup, "").into_owned()
    }

    #[test]
    fn test_inline_emphasis() {
        assert_eq!(format_message("**bold**"), "<strong>bold</strong>");
        assert_eq!(format_message("*it*"), "<em>it</em>");
        assert_eq!(format_message("use `cargo`"), "use <code>cargo</code>");
        assert_eq!(
            format_message("**a** and **b**"),
            "<strong>a</strong> and <strong>b</strong>"
        );
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        assert_eq!(format_message("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(format_message("a ` b"), "a ` b");
        assert_eq!(format_message("**"), "**");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(format_message("one\ntwo"), "one<br>two");
        assert_eq!(format_message("one\r\ntwo"), "one<br>two");
    }

    #[test]
    fn test_links_open_in_new_context() {
        let out = format_message("see https://dekr.co/docs?a=1&b=2 now");
        assert_eq!(
            out,
            "see <a href=\"https://dekr.co/docs?a=1&amp;b=2\" target=\"_blank\" \
             rel=\"noopener noreferrer\">https://dekr.co/docs?a=1&amp;b=2</a> now"
        );
    }

    #[test]
    fn test_link_stops_at_line_break() {
        let out = format_message("http://a.io\nnext");
        assert!(out.starts_with("<a href=\"http://a.io\""));
        assert!(out.ends_with("</a><br>next"));
    }

    #[test]
    fn test_ordered_list() {
        let out = format_message("Steps:\n1. open\n2. close\nDone");
        assert_eq!(
            out,
            "Steps:<ol><li>open</li><li>close</li></ol>Done"
        );
    }

    #[test]
    fn test_bullet_list() {
        let out = format_message("- apples\n• pears");
        assert_eq!(out, "<ul><li>apples</li><li>pears</li></ul>");
    }

    #[test]
    fn test_only_first_run_of_each_kind_is_converted() {
        let out = format_message("1. a\n2. b\ntext\n3. c");
        assert_eq!(out, "<ol><li>a</li><li>b</li></ol>text<br>3. c");

        let mixed = format_message("- x\n1. y\n- z");
        assert_eq!(mixed, "<ul><li>x</li></ul><ol><li>y</li></ol>- z");
    }

    #[test]
    fn test_list_items_keep_inline_styles() {
        let out = format_message("1. **bold** item");
        assert_eq!(out, "<ol><li><strong>bold</strong> item</li></ol>");
    }
}
