//! Response rendering and delivery with plain-text fallback.
//!
//! Generated text is untrusted with respect to markup. [`render`] escapes
//! everything except the bold/italic subset, and every rendered output
//! carries a markup-free copy. [`deliver`] sends the rich form first and,
//! when the channel rejects the markup, sends the plain copy instead.

use crate::error::DeliveryError;
use crate::persona::FormatPolicy;
use async_trait::async_trait;
use std::sync::LazyLock;
use tracing::warn;

const ALLOWED_TAGS: [&str; 4] = ["b", "i", "/b", "/i"];

static EMPHASIS_TAG: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"</?[bi]>").expect("valid tag pattern"));

static STRUCTURAL_TAG: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"<(/?)(b|i|pre)>").expect("valid tag pattern"));

/// Markup dialect of a rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// Plain text.
    None,
    /// Telegram-style HTML subset.
    Html,
}

/// A reply ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    /// Text in the `markup` dialect.
    pub text: String,
    /// Dialect of `text`.
    pub markup: Markup,
    /// The same content with all markup stripped.
    pub plain: String,
}

impl RenderedOutput {
    /// Creates a plain output.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            plain: text.clone(),
            text,
            markup: Markup::None,
        }
    }
}

/// Escapes `&`, `<` and `>`.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Removes the bold and italic tags, leaving every other character as is.
///
/// Only the tags [`render`] keeps under [`FormatPolicy::Emphasis`] count as
/// markup. Anything else that looks like a tag (`x<y and z>w`) is content.
#[must_use]
pub fn strip_emphasis(text: &str) -> String {
    EMPHASIS_TAG.replace_all(text, "").into_owned()
}

/// Escapes the text, then restores the allowed emphasis tags.
fn sanitize_emphasis(text: &str) -> String {
    let mut sanitized = escape_html(text);
    for tag in ALLOWED_TAGS {
        sanitized = sanitized.replace(&format!("&lt;{tag}&gt;"), &format!("<{tag}>"));
    }
    sanitized
}

/// Returns true if `b`, `i` and `pre` tags are balanced and properly nested.
#[must_use]
pub fn is_well_formed(html: &str) -> bool {
    let mut open: Vec<&str> = Vec::new();
    for caps in STRUCTURAL_TAG.captures_iter(html) {
        let closing = !caps[1].is_empty();
        let Some(name) = caps.get(2).map(|m| m.as_str()) else {
            continue;
        };
        if closing {
            if open.pop() != Some(name) {
                return false;
            }
        } else {
            open.push(name);
        }
    }
    open.is_empty()
}

/// Renders generated text according to a format policy.
#[must_use]
pub fn render(text: &str, policy: &FormatPolicy) -> RenderedOutput {
    match policy {
        FormatPolicy::Plain => RenderedOutput::plain(text),
        FormatPolicy::Emphasis => RenderedOutput {
            text: sanitize_emphasis(text),
            markup: Markup::Html,
            plain: strip_emphasis(text),
        },
        FormatPolicy::Preformatted { title, length_line } => {
            let length = length_line
                .as_ref()
                .map(|line| line.replace("{count}", &text.chars().count().to_string()));

            let mut rich = format!("<b>{}</b>\n\n", escape_html(title));
            let mut plain = format!("{title}\n\n");
            if let Some(length) = &length {
                rich.push_str(&escape_html(length));
                rich.push_str("\n\n");
                plain.push_str(length);
                plain.push_str("\n\n");
            }
            rich.push_str(&format!("<pre>{}</pre>", escape_html(text)));
            plain.push_str(text);

            RenderedOutput {
                text: rich,
                markup: Markup::Html,
                plain,
            }
        }
    }
}

/// A channel that can display text to the user.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::MarkupRejected`] if the channel cannot parse
    /// the markup, or [`DeliveryError::Transport`] if nothing was sent.
    async fn send(&self, text: &str, markup: Markup) -> Result<(), DeliveryError>;
}

/// How a rendered output reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// True if the plain copy was sent after the markup was rejected.
    pub fell_back_to_plain: bool,
}

/// Sends a rendered output, retrying once without markup if it is rejected.
///
/// # Errors
///
/// Returns an error if the channel fails for any reason other than markup
/// rejection, or if the plain copy also fails.
pub async fn deliver<S>(
    sink: &S,
    output: &RenderedOutput,
) -> persona_desk_core::Result<Delivery, DeliveryError>
where
    S: MessageSink + ?Sized,
{
    match sink.send(&output.text, output.markup).await {
        Ok(()) => Ok(Delivery {
            fell_back_to_plain: false,
        }),
        Err(DeliveryError::MarkupRejected { reason }) if output.markup != Markup::None => {
            warn!(%reason, "markup rejected, sending plain text");
            sink.send(&output.plain, Markup::None).await?;
            Ok(Delivery {
                fell_back_to_plain: true,
            })
        }
        Err(err) => Err(err.into()),
    }
}
