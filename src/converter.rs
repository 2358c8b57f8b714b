//! Telegram export to Markdown converter.
//!
//! [`MarkdownConverter`] turns one [`Export`] into one Markdown document. It is
//! stateless between calls and can be shared across threads.
//!
//! # Output layout
//!
//! ```text
//! # Chat Name
//!
//! **Type:** personal_chat
//! **ID:** 123
//! **Messages:** 2
//!
//! ---
//!
//! ## 2023-01-01 10:00:00 - Alice
//!
//! Hello \*world\*
//!
//! ---
//! ```
//!
//! # Example
//!
//! ```rust
//! use chatdown::converter::MarkdownConverter;
//!
//! let json = r#"{"name": "Chat", "type": "personal_chat", "messages": [
//!     {"type": "message", "date": "2023-01-01T10:00:00", "from": "Alice", "text": "Hi"}
//! ]}"#;
//!
//! let markdown = MarkdownConverter::new().convert_str(json)?;
//! assert!(markdown.starts_with("# Chat\n"));
//! assert!(markdown.contains("## 2023-01-01 10:00:00 - Alice"));
//! # Ok::<(), chatdown::ChatdownError>(())
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::config::ConvertConfig;
use crate::error::{ChatdownError, Result};
use crate::export::{Contact, Export, Location, Message, MessageKind, Poll, Text, TextNode};
use crate::markdown::{escape_fragment, escape_markdown, render_date, render_span};

const SEPARATOR: &str = "---\n\n";

/// Converter from Telegram exports to Markdown.
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    config: ConvertConfig,
}

impl MarkdownConverter {
    /// Creates a converter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a converter with custom configuration.
    pub fn with_config(config: ConvertConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Renders a whole export.
    ///
    /// Never fails: malformed text degrades to empty output for that message.
    pub fn convert(&self, export: &Export) -> String {
        let mut out = String::new();

        if self.config.include_metadata {
            out.push_str(&format!("# {}\n\n", export.name));
            out.push_str(&format!("**Type:** {}  \n", export.kind));
            if let Some(id) = export.chat_id() {
                out.push_str(&format!("**ID:** {}  \n", id));
            }
            out.push_str(&format!("**Messages:** {}  \n\n", export.messages.len()));
            out.push_str(SEPARATOR);
        }

        for message in &export.messages {
            let section = self.convert_message(message);
            if !section.is_empty() {
                out.push_str(&section);
                out.push('\n');
            }
        }

        out
    }

    /// Renders one message section, including its trailing separator.
    ///
    /// Returns an empty string for service messages that carry neither an
    /// action nor any text.
    pub fn convert_message(&self, msg: &Message) -> String {
        let text = msg.text.as_ref().map(render_text).unwrap_or_default();

        if msg.is_service() && msg.action().is_none() && text.is_empty() {
            return String::new();
        }

        let mut out = String::from("## ");
        if !msg.date.is_empty() {
            out.push_str(&render_date(
                &msg.date,
                &self.config.date_format,
                self.config.date_policy,
            ));
        }
        if let Some(sender) = msg.sender() {
            out.push_str(&format!(" - {}", sender));
        }
        out.push_str("\n\n");

        match msg.kind {
            MessageKind::Service => render_service(msg, &mut out),
            MessageKind::Regular | MessageKind::Other(_) => self.render_regular(msg, &text, &mut out),
        }

        if let Some(origin) = msg.forwarded_from.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("\n*Forwarded from: {}*\n", origin));
        }
        if let Some(reply_to) = msg.reply_to() {
            out.push_str(&format!("\n*Reply to message ID: {}*\n", reply_to));
        }
        if let Some(bot) = msg.via_bot.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("\n*Via bot: {}*\n", bot));
        }

        out.push('\n');
        out.push_str(SEPARATOR);
        out
    }

    /// Parses and renders an export held in memory.
    pub fn convert_str(&self, content: &str) -> Result<String> {
        let export = Export::from_json(content).map_err(|e| ChatdownError::parse(e, None))?;
        Ok(self.convert(&export))
    }

    /// Parses and renders raw JSON bytes, tagging parse errors with `path`.
    pub fn convert_slice(&self, content: &[u8], path: Option<&Path>) -> Result<String> {
        let export = Export::from_slice(content)
            .map_err(|e| ChatdownError::parse(e, path.map(Path::to_path_buf)))?;
        Ok(self.convert(&export))
    }

    /// Converts `input` and writes the result to `output`.
    ///
    /// A partially written `output` is removed before the error is returned.
    pub fn convert_file(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<()> {
        let input = input.as_ref();
        let content = fs::read(input).map_err(|e| ChatdownError::read(input, e))?;
        let markdown = self.convert_slice(&content, Some(input))?;
        write_output(output.as_ref(), &markdown)
    }

    fn render_regular(&self, msg: &Message, text: &str, out: &mut String) {
        if !text.is_empty() {
            out.push_str(text);
            out.push_str("\n\n");
        }

        if self.config.include_media {
            render_media(msg, out);
        }
        if let Some(poll) = &msg.poll {
            render_poll(poll, out);
        }
        if let Some(contact) = &msg.contact {
            render_contact(contact, out);
        }
        if let Some(location) = &msg.location {
            render_location(location, out);
        }
    }
}

/// Flattens a message body into escaped Markdown.
///
/// Literal fragments of a span sequence keep one boundary space so words
/// stay separated from neighbouring spans; the joined result is trimmed.
///
/// # Example
///
/// ```rust
/// use chatdown::converter::render_text;
/// use chatdown::export::{Span, SpanKind, Text, TextNode};
///
/// let text = Text::Spans(vec![
///     TextNode::Literal("Hi ".into()),
///     TextNode::Formatted(Span::new(SpanKind::Bold, "there")),
/// ]);
/// assert_eq!(render_text(&text), "Hi **there**");
/// ```
pub fn render_text(text: &Text) -> String {
    match text {
        Text::Plain(s) => escape_markdown(s),
        Text::Spans(nodes) => {
            let joined: String = nodes
                .iter()
                .map(|node| match node {
                    TextNode::Literal(s) => escape_fragment(s),
                    TextNode::Formatted(span) => render_span(span),
                    TextNode::Unsupported(_) => String::new(),
                })
                .collect();
            joined.trim().to_string()
        }
        Text::Unsupported(_) => String::new(),
    }
}

fn render_service(msg: &Message, out: &mut String) {
    let Some(action) = msg.action() else {
        return;
    };

    out.push_str(&format!("*{}*", action));
    if let Some(actor) = msg.actor.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!(" by {}", actor));
    }
    if !msg.members.is_empty() {
        out.push_str(&format!(" - Members: {}", msg.members.join(", ")));
    }
    if let Some(inviter) = msg.inviter.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!(" - Invited by: {}", inviter));
    }
    if let Some(title) = msg.title.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!(" - Title: {}", title));
    }
    out.push_str("\n\n");
}

fn render_media(msg: &Message, out: &mut String) {
    if let Some(photo) = msg.photo.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("📷 **Photo:** {}", base_name(photo)));
        if msg.width > 0 && msg.height > 0 {
            out.push_str(&format!(" ({}x{})", msg.width, msg.height));
        }
        out.push_str("\n\n");
    }

    if let Some(file) = msg.file.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("📎 **File:** {}", base_name(file)));
        if let Some(mime) = msg.mime_type.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!(" ({})", mime));
        }
        if msg.duration_seconds > 0 {
            out.push_str(&format!(" - Duration: {} seconds", msg.duration_seconds));
        }
        out.push_str("\n\n");
    }

    if let Some(media_type) = msg.media_type.as_deref() {
        if !media_type.is_empty() && media_type != "photo" {
            out.push_str(&format!("🎬 **Media Type:** {}\n\n", media_type));
        }
    }
}

fn render_poll(poll: &Poll, out: &mut String) {
    out.push_str("📊 **Poll**\n\n");
    out.push_str(&format!("**Question:** {}\n\n", poll.question));

    if !poll.answers.is_empty() {
        out.push_str("**Options:**\n");
        for answer in &poll.answers {
            let marker = if answer.chosen { "☑" } else { "☐" };
            out.push_str(&format!("- {} {} ({} votes)\n", marker, answer.text, answer.voters));
        }
        out.push('\n');
    }

    if poll.closed {
        out.push_str("*Poll is closed*\n");
    }

    out.push_str(&format!("**Total voters:** {}\n\n", poll.total_voters));
}

fn render_contact(contact: &Contact, out: &mut String) {
    out.push_str("📞 **Contact**\n\n");

    if !contact.first_name.is_empty() || !contact.last_name.is_empty() {
        out.push_str(&format!(
            "**Name:** {} {}\n",
            contact.first_name, contact.last_name
        ));
    }
    if !contact.phone_number.is_empty() {
        out.push_str(&format!("**Phone:** {}\n", contact.phone_number));
    }
    if let Some(user_id) = contact.user_id() {
        out.push_str(&format!("**User ID:** {}\n", user_id));
    }

    out.push('\n');
}

fn render_location(location: &Location, out: &mut String) {
    let Location {
        latitude,
        longitude,
    } = *location;

    out.push_str("📍 **Location**\n\n");
    out.push_str(&format!("**Coordinates:** {:.6}, {:.6}\n", latitude, longitude));
    out.push_str(&format!(
        "**Map Link:** https://maps.google.com/?q={:.6},{:.6}\n\n",
        latitude, longitude
    ));
}

/// Last path component of an attachment reference, `/` or `\` separated.
fn base_name(reference: &str) -> &str {
    let trimmed = reference.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return reference;
    }
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

fn write_output(path: &Path, markdown: &str) -> Result<()> {
    let mut file = File::create(path).map_err(|e| ChatdownError::write(path, e))?;

    if let Err(err) = file.write_all(markdown.as_bytes()).and_then(|()| file.flush()) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(ChatdownError::write(path, err));
    }

    Ok(())
}
