//! Line-based console channel.
//!
//! Each input line is one turn. Slash commands cover the inputs a chat
//! platform would send as buttons or attachments.

use async_trait::async_trait;
use persona_desk_conversation::format::is_well_formed;
use persona_desk_conversation::{
    DeliveryError, Markup, MessageSink, ModeId, NavigationMap, NavigationTarget, Reply,
    TurnInput, TurnOutcome, deliver,
};
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// What one console line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Run a turn.
    Turn(TurnInput),
    /// Run a voice turn from an audio file.
    Voice(PathBuf),
    /// Stop reading input.
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
#[must_use]
pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    let parsed = match command {
        "/quit" | "/exit" => ConsoleCommand::Quit,
        "/back" => ConsoleCommand::Turn(TurnInput::Navigate(NavigationTarget::Back)),
        "/reset" => ConsoleCommand::Turn(TurnInput::ResetHistory),
        "/mode" if !argument.is_empty() => ConsoleCommand::Turn(TurnInput::Navigate(
            NavigationTarget::Enter(ModeId::new(argument)),
        )),
        "/voice" if !argument.is_empty() => ConsoleCommand::Voice(PathBuf::from(argument)),
        _ => ConsoleCommand::Turn(TurnInput::Text(line.to_string())),
    };
    Some(parsed)
}

/// Writes messages to a console stream.
///
/// Rejects HTML with unbalanced tags the way a chat platform does, so
/// malformed generated markup goes through the plain-text fallback.
pub struct ConsoleSink<W> {
    out: Mutex<W>,
}

impl<W> ConsoleSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a sink over a writer.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> MessageSink for ConsoleSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, text: &str, markup: Markup) -> Result<(), DeliveryError> {
        if markup == Markup::Html && !is_well_formed(text) {
            return Err(DeliveryError::MarkupRejected {
                reason: "unbalanced tags".to_string(),
            });
        }

        let mut out = self.out.lock().await;
        let transport = |e: std::io::Error| DeliveryError::Transport {
            reason: e.to_string(),
        };
        out.write_all(text.as_bytes()).await.map_err(transport)?;
        out.write_all(b"\n").await.map_err(transport)?;
        out.flush().await.map_err(transport)
    }
}

/// Shows a turn's acknowledgement and reply, then the menu.
///
/// # Errors
///
/// Returns an error if the sink fails.
pub async fn show_outcome<S>(
    sink: &S,
    outcome: &TurnOutcome,
    menu: &NavigationMap,
) -> persona_desk_core::Result<(), DeliveryError>
where
    S: MessageSink + ?Sized,
{
    if let Some(acknowledgement) = &outcome.acknowledgement {
        sink.send(acknowledgement, Markup::None).await?;
    }

    match &outcome.reply {
        Reply::Text(rendered) => {
            deliver(sink, rendered).await?;
        }
        Reply::Media { reference, caption } => {
            if let Some(caption) = caption {
                sink.send(caption, Markup::None).await?;
            }
            sink.send(&reference.location, Markup::None).await?;
        }
        Reply::Notice(text) => sink.send(text, Markup::None).await?,
    }

    show_menu(sink, menu).await
}

/// Shows the navigation labels.
///
/// # Errors
///
/// Returns an error if the sink fails.
pub async fn show_menu<S>(
    sink: &S,
    menu: &NavigationMap,
) -> persona_desk_core::Result<(), DeliveryError>
where
    S: MessageSink + ?Sized,
{
    let line = format!("[ {} ]", menu.labels().join(" | "));
    sink.send(&line, Markup::None).await?;
    Ok(())
}
