//! Property-based tests for chatdown.
//!
//! These tests generate random inputs to find edge cases.

use std::path::PathBuf;
use std::time::Duration;

use proptest::prelude::*;

use chatdown::job::destination_path;
use chatdown::markdown::{ESCAPED_CHARS, escape_markdown, unescape_markdown};
use chatdown::prelude::*;
use chatdown::progress::estimate_remaining;

/// Characters mixing plain text, markdown syntax, whitespace and unicode.
fn arb_char() -> impl Strategy<Value = char> {
    prop::sample::select(vec![
        'a', 'Z', '7', ' ', ' ', '\n', '\t', '\u{00A0}', '\u{3000}', '\\', '`', '*', '_', '{',
        '}', '[', ']', '(', ')', '#', '+', '-', '.', '!', '|', '~', '>', '@', 'я', '日', '🦄',
        '\u{0301}',
    ])
}

fn arb_text(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(arb_char(), 0..max_len).prop_map(|chars| chars.into_iter().collect())
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A message that is either visible (carrying `token`) or a contentless
/// service event.
fn arb_message(index: usize) -> impl Strategy<Value = (bool, Message)> {
    any::<bool>().prop_map(move |visible| {
        let message = if visible {
            Message::new("Sender", format!("<{index}>"))
        } else {
            Message {
                kind: MessageKind::Service,
                ..Message::default()
            }
        };
        (visible, message)
    })
}

fn arb_messages(max_len: usize) -> impl Strategy<Value = Vec<(bool, Message)>> {
    (0..max_len).prop_flat_map(|len| (0..len).map(arb_message).collect::<Vec<_>>())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // ============================================
    // ESCAPING PROPERTIES
    // ============================================

    /// Removing the escapes gives back the whitespace-normalized input
    #[test]
    fn unescape_restores_normalized_text(text in arb_text(40)) {
        prop_assert_eq!(unescape_markdown(&escape_markdown(&text)), normalize_whitespace(&text));
    }

    /// Every special character in the output is preceded by a backslash
    #[test]
    fn no_special_char_left_unescaped(text in arb_text(40)) {
        let escaped = escape_markdown(&text);
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                prop_assert!(chars.next().is_some_and(|next| ESCAPED_CHARS.contains(&next)));
            } else {
                prop_assert!(!ESCAPED_CHARS.contains(&c), "unescaped {:?} in {:?}", c, escaped);
            }
        }
    }

    /// Output never starts or ends with whitespace and has no whitespace runs
    #[test]
    fn escaped_text_is_trimmed_and_collapsed(text in arb_text(40)) {
        let escaped = escape_markdown(&text);
        prop_assert_eq!(escaped.trim(), escaped.as_str());
        prop_assert!(!escaped.contains("  "));
        prop_assert!(!escaped.contains('\n'));
    }

    // ============================================
    // CONVERSION PROPERTIES
    // ============================================

    /// Visible messages appear in order, contentless service messages vanish
    #[test]
    fn conversion_preserves_order(messages in arb_messages(30)) {
        let visible: Vec<usize> = messages
            .iter()
            .enumerate()
            .filter(|(_, (v, _))| *v)
            .map(|(i, _)| i)
            .collect();
        let export = Export {
            messages: messages.into_iter().map(|(_, m)| m).collect(),
            ..Export::default()
        };

        let converter = MarkdownConverter::with_config(ConvertConfig::new().with_metadata(false));
        let md = converter.convert(&export);

        prop_assert_eq!(md.matches("---\n\n").count(), visible.len());
        let mut cursor = 0;
        for index in visible {
            let token = format!("<{index}>");
            let found = md[cursor..].find(&token);
            prop_assert!(found.is_some(), "missing {} in {:?}", token, md);
            cursor += found.unwrap_or_default() + token.len();
        }
    }

    /// Arbitrary text never breaks conversion
    #[test]
    fn conversion_is_total(texts in prop::collection::vec(arb_text(30), 0..10)) {
        let export = Export {
            name: "Chat".into(),
            messages: texts.iter().map(|t| Message::new("A", t.as_str())).collect(),
            ..Export::default()
        };
        let md = MarkdownConverter::new().convert(&export);
        let expected_header = format!("**Messages:** {}  \n", texts.len());
        prop_assert!(md.contains(&expected_header));
    }

    // ============================================
    // PIPELINE HELPERS
    // ============================================

    /// Destination keeps the directory and stem, swapping the extension
    #[test]
    fn destination_keeps_parent_and_stem(stem in "[a-z]{1,8}", dir in "[a-z]{1,8}") {
        let source = PathBuf::from(&dir).join(format!("{stem}.json"));
        let dest = destination_path(&source);
        prop_assert_eq!(dest.parent(), source.parent());
        prop_assert_eq!(dest.file_stem(), source.file_stem());
        prop_assert_eq!(dest.extension().and_then(|e| e.to_str()), Some("md"));
    }

    /// The running-average estimate scales with the remaining share
    #[test]
    fn estimate_is_proportional(elapsed_ms in 0u64..100_000, processed in 1usize..100, extra in 0usize..100) {
        let total = processed + extra;
        let eta = estimate_remaining(Duration::from_millis(elapsed_ms), processed, total);
        let expected = elapsed_ms as f64 * extra as f64 / processed as f64;
        prop_assert!((eta.as_secs_f64() * 1000.0 - expected).abs() < 1.0);
    }
}
