//! Markdown building blocks: escaping, span formatting and date rendering.
//!
//! Everything here is pure and stateless; the [`converter`](crate::converter)
//! composes these into whole documents.

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{Local, NaiveDateTime};
use regex::Regex;
use tracing::warn;

use crate::config::{DEFAULT_DATE_FORMAT, DatePolicy};
use crate::export::{Span, SpanKind};

/// Characters that receive a backslash in user text.
pub const ESCAPED_CHARS: &[char] = &[
    '\\', '`', '*', '_', '{', '}', '[', ']', '(', ')', '#', '+', '-', '.', '!', '|',
];

/// Source date layouts, tried in order.
const SOURCE_DATE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Normalizes whitespace and escapes Markdown control characters.
///
/// Runs of whitespace (Unicode-aware, newlines included) collapse to one
/// space, the result is trimmed, then every character of [`ESCAPED_CHARS`]
/// is prefixed with a backslash. A single pass over the characters means an
/// existing backslash is escaped exactly once.
///
/// # Example
///
/// ```rust
/// use chatdown::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("Hello *world*"), r"Hello \*world\*");
/// assert_eq!(escape_markdown("  a\n\n b  "), "a b");
/// assert_eq!(escape_markdown(r"C:\path"), r"C:\\path");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    escape_chars(collapsed.trim())
}

/// Like [`escape_markdown`] but keeps a single leading/trailing space.
///
/// Used for literal fragments between spans, where the boundary space
/// separates words from the neighbouring span.
///
/// ```rust
/// use chatdown::markdown::escape_fragment;
///
/// assert_eq!(escape_fragment("Hi \n "), "Hi ");
/// ```
pub fn escape_fragment(text: &str) -> String {
    escape_chars(&WHITESPACE_RUN.replace_all(text, " "))
}

fn escape_chars(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if ESCAPED_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reverses [`escape_markdown`]'s backslashes.
///
/// Whitespace normalization is not reversible; the result is the
/// whitespace-normalized original.
pub fn unescape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Escapes a span's text and wraps it in the markers for its kind.
///
/// The markers themselves are structural and are never escaped. Spans
/// without a kind, or with a kind that has no Markdown equivalent, render
/// as plain escaped text.
///
/// # Example
///
/// ```rust
/// use chatdown::export::{Span, SpanKind};
/// use chatdown::markdown::render_span;
///
/// assert_eq!(render_span(&Span::new(SpanKind::Bold, "there")), "**there**");
/// assert_eq!(render_span(&Span::link("docs", "https://e.com")), "[docs](https://e.com)");
/// ```
pub fn render_span(span: &Span) -> String {
    let text = escape_markdown(&span.text);

    let Some(kind) = &span.kind else {
        return text;
    };

    match kind {
        SpanKind::Bold => format!("**{}**", text),
        SpanKind::Italic => format!("*{}*", text),
        SpanKind::Code => format!("`{}`", text),
        SpanKind::Pre => format!("```\n{}\n```", text),
        SpanKind::TextLink => match &span.href {
            Some(href) => format!("[{}]({})", text, href),
            None => text,
        },
        SpanKind::Mention => format!("@{}", text),
        SpanKind::Hashtag => format!("#{}", text),
        SpanKind::Strikethrough => format!("~~{}~~", text),
        SpanKind::Underline => format!("__{}__", text),
        SpanKind::Spoiler => format!("||{}||", text),
        SpanKind::Other(_) => text,
    }
}

/// Parses a source date using the known layouts.
///
/// Returns `None` when no layout matches.
pub fn parse_source_date(raw: &str) -> Option<NaiveDateTime> {
    SOURCE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Renders a source date for a message header.
///
/// Unparseable input follows `policy`. An invalid `format` pattern falls
/// back to `%Y-%m-%d %H:%M:%S`.
pub fn render_date(raw: &str, format: &str, policy: DatePolicy) -> String {
    let parsed = match parse_source_date(raw) {
        Some(date) => date,
        None => match policy {
            DatePolicy::BestEffortOrNow => {
                warn!(date = raw, "unrecognized date format, substituting current time");
                Local::now().naive_local()
            }
            DatePolicy::BestEffortOrRaw => return raw.to_string(),
        },
    };
    format_date(&parsed, format)
}

fn format_date(date: &NaiveDateTime, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(format)).is_err() {
        warn!(format, "invalid date format pattern, using default");
        out.clear();
        let _ = write!(out, "{}", date.format(DEFAULT_DATE_FORMAT));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_every_special_char() {
        assert_eq!(
            escape_markdown(r"\`*_{}[]()#+-.!|"),
            r"\\\`\*\_\{\}\[\]\(\)\#\+\-\.\!\|"
        );
    }

    #[test]
    fn test_escape_plain_text_untouched() {
        assert_eq!(escape_markdown("Hello world"), "Hello world");
        assert_eq!(escape_markdown("~ > < = & @ $ %"), "~ > < = & @ $ %");
    }

    #[test]
    fn test_escape_collapses_whitespace() {
        assert_eq!(escape_markdown("  Hello \n\t  world  "), "Hello world");
        assert_eq!(escape_markdown("\n\n\n"), "");
        assert_eq!(escape_markdown(""), "");
    }

    #[test]
    fn test_escape_does_not_double_escape() {
        assert_eq!(escape_markdown(r"\*"), r"\\\*");
    }

    #[test]
    fn test_escape_unicode() {
        assert_eq!(escape_markdown("Привет, мир!"), r"Привет, мир\!");
        assert_eq!(escape_markdown("日本語 (テスト)"), r"日本語 \(テスト\)");
        assert_eq!(escape_markdown("👨‍👩‍👧 - family"), r"👨‍👩‍👧 \- family");
        // combining marks stay attached to their base character
        assert_eq!(escape_markdown("e\u{0301}."), "e\u{0301}\\.");
    }

    #[test]
    fn test_escape_unicode_whitespace() {
        // NBSP and em space are whitespace too
        assert_eq!(escape_markdown("a\u{00A0}\u{2003}b"), "a b");
        assert_eq!(escape_markdown("\u{3000}x\u{3000}"), "x");
    }

    #[test]
    fn test_escape_fragment_keeps_boundary_space() {
        assert_eq!(escape_fragment("  a  b  "), " a b ");
        assert_eq!(escape_fragment("x."), r"x\.");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let original = r"a*b_c \ d [e](f) #g";
        assert_eq!(unescape_markdown(&escape_markdown(original)), original);
    }

    #[test]
    fn test_render_span_kinds() {
        let cases = [
            (SpanKind::Bold, "**t**"),
            (SpanKind::Italic, "*t*"),
            (SpanKind::Code, "`t`"),
            (SpanKind::Pre, "```\nt\n```"),
            (SpanKind::Mention, "@t"),
            (SpanKind::Hashtag, "#t"),
            (SpanKind::Strikethrough, "~~t~~"),
            (SpanKind::Underline, "__t__"),
            (SpanKind::Spoiler, "||t||"),
            (SpanKind::Other("email".into()), "t"),
        ];
        for (kind, expected) in cases {
            assert_eq!(render_span(&Span::new(kind.clone(), "t")), expected, "{kind:?}");
        }
    }

    #[test]
    fn test_render_span_escapes_inside_markers() {
        assert_eq!(render_span(&Span::new(SpanKind::Bold, "a*b")), r"**a\*b**");
        assert_eq!(render_span(&Span::new(SpanKind::Hashtag, "#tag")), r"#\#tag");
    }

    #[test]
    fn test_render_text_link() {
        assert_eq!(
            render_span(&Span::link("click here", "https://example.com/a_b")),
            "[click here](https://example.com/a_b)"
        );

        let no_href = Span::new(SpanKind::TextLink, "site.com");
        assert_eq!(render_span(&no_href), r"site\.com");
    }

    #[test]
    fn test_render_untyped_span() {
        let span = Span {
            kind: None,
            text: "plain!".into(),
            href: None,
            user_id: None,
        };
        assert_eq!(render_span(&span), r"plain\!");
    }

    #[test]
    fn test_parse_source_date_formats() {
        let iso = parse_source_date("2023-01-01T10:00:00").unwrap();
        let spaced = parse_source_date("2023-01-01 10:00:00").unwrap();
        assert_eq!(iso, spaced);

        assert!(parse_source_date("01/01/2023").is_none());
        assert!(parse_source_date("").is_none());
    }

    #[test]
    fn test_render_date() {
        assert_eq!(
            render_date("2023-01-01T10:00:00", DEFAULT_DATE_FORMAT, DatePolicy::BestEffortOrNow),
            "2023-01-01 10:00:00"
        );
        assert_eq!(
            render_date("2023-01-01 10:00:00", "%d.%m.%Y", DatePolicy::BestEffortOrNow),
            "01.01.2023"
        );
    }

    #[test]
    fn test_render_date_raw_policy() {
        assert_eq!(
            render_date("yesterday", DEFAULT_DATE_FORMAT, DatePolicy::BestEffortOrRaw),
            "yesterday"
        );
    }

    #[test]
    fn test_render_date_now_policy() {
        let rendered = render_date("yesterday", DEFAULT_DATE_FORMAT, DatePolicy::BestEffortOrNow);
        let parsed = NaiveDateTime::parse_from_str(&rendered, DEFAULT_DATE_FORMAT).unwrap();
        let drift = (Local::now().naive_local() - parsed).num_seconds().abs();
        assert!(drift < 60);
    }

    #[test]
    fn test_render_date_invalid_pattern_falls_back() {
        assert_eq!(
            render_date("2023-01-01T10:00:00", "%Q", DatePolicy::BestEffortOrNow),
            "2023-01-01 10:00:00"
        );
    }
}
