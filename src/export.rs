//! Typed model of a Telegram Desktop JSON export.
//!
//! Telegram exports a chat as a single JSON document:
//!
//! ```json
//! {
//!   "name": "Chat Name",
//!   "type": "personal_chat",
//!   "id": 123456789,
//!   "messages": [
//!     {
//!       "id": 1,
//!       "type": "message",
//!       "date": "2024-01-15T10:30:00",
//!       "from": "Alice",
//!       "text": "Hello" | ["Hello ", {"type": "bold", "text": "world"}]
//!     }
//!   ]
//! }
//! ```
//!
//! The schema is loose: almost every field is optional, numbers may be `null`,
//! and `text` is either a string or a list mixing strings and formatted spans.
//! Deserialization is lenient to match: missing or `null` fields take their
//! zero value, and a zero numeric id means "absent".

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A whole chat export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Export {
    /// Chat title.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    /// Chat type as reported by Telegram (`personal_chat`, `private_group`, ...).
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,

    /// Chat id, `0` when absent.
    #[serde(default, deserialize_with = "nullable")]
    pub id: i64,

    /// Messages in chronological order.
    #[serde(default, deserialize_with = "nullable")]
    pub messages: Vec<Message>,
}

impl Export {
    /// Parses an export from a JSON string.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Parses an export from raw JSON bytes.
    pub fn from_slice(content: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(content)
    }

    /// Returns the chat id, or `None` when it is zero.
    pub fn chat_id(&self) -> Option<i64> {
        non_zero(self.id)
    }
}

/// The `type` field of a message.
///
/// Unknown kinds are preserved in [`MessageKind::Other`] and rendered like
/// regular messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// `"message"`
    #[default]
    Regular,
    /// `"service"` (joins, pins, title changes, ...)
    Service,
    /// Anything else
    Other(String),
}

impl From<String> for MessageKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "message" => MessageKind::Regular,
            "service" => MessageKind::Service,
            _ => MessageKind::Other(value),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Regular => "message".to_string(),
            MessageKind::Service => "service".to_string(),
            MessageKind::Other(s) => s,
        }
    }
}

/// A single entry of the `messages` array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Message id, `0` when absent.
    #[serde(default, deserialize_with = "nullable")]
    pub id: i64,

    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: MessageKind,

    /// Source timestamp, usually `2024-01-15T10:30:00`.
    #[serde(default, deserialize_with = "nullable")]
    pub date: String,

    /// Display name of the author.
    #[serde(rename = "from", default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    /// Message body. `None` when the field is missing or `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,

    // Media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(
        rename = "duration_seconds",
        alias = "duration",
        default,
        deserialize_with = "nullable"
    )]
    pub duration_seconds: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub width: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    // Relations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarded_from: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub reply_to_message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via_bot: Option<String>,

    // Service events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "nullable_strings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inviter: Option<String>,

    // Structured attachments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<Poll>,
    #[serde(
        rename = "contact_information",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub contact: Option<Contact>,
    #[serde(
        rename = "location_information",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Location>,
}

impl Message {
    /// Creates a regular message with a plain-text body.
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            text: Some(Text::Plain(text.into())),
            ..Self::default()
        }
    }

    /// Creates a service message with the given action.
    pub fn service(action: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Service,
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// Sets the source date string.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_text(mut self, text: Text) -> Self {
        self.text = Some(text);
        self
    }

    /// Returns the sender, treating an empty name as absent.
    pub fn sender(&self) -> Option<&str> {
        non_empty(self.sender.as_deref())
    }

    /// Returns the service action, treating an empty action as absent.
    pub fn action(&self) -> Option<&str> {
        non_empty(self.action.as_deref())
    }

    /// Returns the id of the replied-to message, or `None` when it is zero.
    pub fn reply_to(&self) -> Option<i64> {
        non_zero(self.reply_to_message_id)
    }

    /// Returns `true` for service events.
    pub fn is_service(&self) -> bool {
        self.kind == MessageKind::Service
    }
}

/// The polymorphic `text` field.
///
/// Both shapes flatten to the same rendered string; anything else degrades
/// to [`Text::Unsupported`] and renders empty instead of failing the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Text {
    /// `"text": "Hello"`
    Plain(String),
    /// `"text": ["Hello ", {"type": "bold", "text": "world"}]`
    Spans(Vec<TextNode>),
    /// Any other JSON value.
    Unsupported(Value),
}

impl Text {
    /// Returns the text without any formatting, spans concatenated.
    ///
    /// # Example
    ///
    /// ```rust
    /// use chatdown::export::{Text, TextNode, Span, SpanKind};
    ///
    /// let text = Text::Spans(vec![
    ///     TextNode::Literal("Hi ".into()),
    ///     TextNode::Formatted(Span::new(SpanKind::Bold, "there")),
    /// ]);
    /// assert_eq!(text.plain_text(), "Hi there");
    /// ```
    pub fn plain_text(&self) -> String {
        match self {
            Text::Plain(s) => s.clone(),
            Text::Spans(nodes) => nodes
                .iter()
                .filter_map(|node| match node {
                    TextNode::Literal(s) => Some(s.as_str()),
                    TextNode::Formatted(span) => Some(span.text.as_str()),
                    TextNode::Unsupported(_) => None,
                })
                .collect(),
            Text::Unsupported(_) => String::new(),
        }
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Text::Plain(value.to_string())
    }
}

/// One element of a span array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextNode {
    /// A bare string.
    Literal(String),
    /// An object with at least a string `text`.
    Formatted(Span),
    /// Anything else; skipped when rendering.
    Unsupported(Value),
}

/// A formatted fragment of message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Formatting kind. `None` renders as plain text.
    #[serde(
        rename = "type",
        default,
        deserialize_with = "string_only",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<SpanKind>,
    pub text: String,
    /// Target URL for `text_link` spans.
    #[serde(default, deserialize_with = "string_only", skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Mentioned user, number or string depending on the export version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
}

impl Span {
    pub fn new(kind: SpanKind, text: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            text: text.into(),
            href: None,
            user_id: None,
        }
    }

    /// Creates a `text_link` span.
    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::new(SpanKind::TextLink, text)
        }
    }
}

/// Formatting kind of a [`Span`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SpanKind {
    Bold,
    Italic,
    Code,
    Pre,
    TextLink,
    Mention,
    Hashtag,
    Strikethrough,
    Underline,
    Spoiler,
    /// Any kind without dedicated formatting (`link`, `email`, `phone`, ...)
    Other(String),
}

impl SpanKind {
    pub fn as_str(&self) -> &str {
        match self {
            SpanKind::Bold => "bold",
            SpanKind::Italic => "italic",
            SpanKind::Code => "code",
            SpanKind::Pre => "pre",
            SpanKind::TextLink => "text_link",
            SpanKind::Mention => "mention",
            SpanKind::Hashtag => "hashtag",
            SpanKind::Strikethrough => "strikethrough",
            SpanKind::Underline => "underline",
            SpanKind::Spoiler => "spoiler",
            SpanKind::Other(s) => s,
        }
    }
}

impl From<String> for SpanKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bold" => SpanKind::Bold,
            "italic" => SpanKind::Italic,
            "code" => SpanKind::Code,
            "pre" => SpanKind::Pre,
            "text_link" => SpanKind::TextLink,
            "mention" => SpanKind::Mention,
            "hashtag" => SpanKind::Hashtag,
            "strikethrough" => SpanKind::Strikethrough,
            "underline" => SpanKind::Underline,
            "spoiler" => SpanKind::Spoiler,
            _ => SpanKind::Other(value),
        }
    }
}

impl From<SpanKind> for String {
    fn from(kind: SpanKind) -> Self {
        match kind {
            SpanKind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// A poll attached to a message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Poll {
    #[serde(default, deserialize_with = "nullable")]
    pub question: String,
    #[serde(default, deserialize_with = "nullable")]
    pub closed: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub total_voters: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub answers: Vec<PollAnswer>,
}

/// One option of a [`Poll`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PollAnswer {
    #[serde(default, deserialize_with = "nullable")]
    pub text: String,
    /// Number of votes for this option.
    #[serde(default, deserialize_with = "nullable")]
    pub voters: u64,
    /// Whether the exporting user picked this option.
    #[serde(default, deserialize_with = "nullable")]
    pub chosen: bool,
}

/// A shared contact card.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "nullable")]
    pub first_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub last_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user_id: i64,
}

impl Contact {
    /// Returns the contact's user id, or `None` when it is zero.
    pub fn user_id(&self) -> Option<i64> {
        non_zero(self.user_id)
    }
}

/// A shared location.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "nullable")]
    pub latitude: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub longitude: f64,
}

fn non_zero(id: i64) -> Option<i64> {
    (id != 0).then_some(id)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Deserializes `null` as the type's default value.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keeps string values; any other JSON value reads as absent.
fn string_only<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(T::from(s)),
        _ => None,
    })
}

/// Deserializes a list of names where entries may be `null` (deleted accounts).
fn nullable_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(names
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}
