//! Terminal surface for the chat widget
//!
//! Stdin lines drive the widget; a render task turns [`WidgetEvent`]s into
//! output. Message text goes through [`markup::parse`], emphasis becomes ANSI
//! bold and control characters are printed escaped.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::conversation::{Message, Role};
use crate::core::{ChatWidget, WidgetEvent};
use crate::i18n::{keys, TextProvider};
use crate::markup;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const ASSISTANT_NAME: &str = "SkillMate";

const HELP: &str = "Commands:
  /open          show the chat
  /close         hide the chat
  /reset         start a new conversation
  /suggest <n>   send quick question n
  /state         dump the widget state as JSON
  /html          print the transcript as HTML
  /quit          exit
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    Reset,
    Suggest(usize),
    State,
    Html,
    Help,
    Quit,
    Say(String),
    Unknown(String),
}

/// Interpret one input line; plain text is kept untrimmed
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Command::Say(line.to_string());
    }

    let mut words = trimmed.split_whitespace();
    let name = words.next().unwrap_or_default();
    match (name, words.next()) {
        ("/open", None) => Command::Open,
        ("/close", None) => Command::Close,
        ("/reset", None) => Command::Reset,
        ("/state", None) => Command::State,
        ("/html", None) => Command::Html,
        ("/help", None) => Command::Help,
        ("/quit" | "/exit", None) => Command::Quit,
        ("/suggest", Some(n)) => match n.parse::<usize>() {
            Ok(n) if n > 0 => Command::Suggest(n),
            _ => Command::Unknown(trimmed.to_string()),
        },
        _ => Command::Unknown(trimmed.to_string()),
    }
}

/// Render message text with ANSI emphasis
pub fn render_text(text: &str) -> Vec<String> {
    markup::parse(text)
        .into_iter()
        .map(|line| {
            line.into_iter()
                .map(|span| {
                    let safe = escape_controls(&span.text);
                    if span.emphasized {
                        format!("{BOLD}{safe}{RESET}")
                    } else {
                        safe
                    }
                })
                .collect()
        })
        .collect()
}

fn escape_controls(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() {
                c.escape_default().to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}

/// One message as printed in the transcript
pub fn render_message(message: &Message, labels: &dyn TextProvider) -> String {
    let who = match message.role {
        Role::User => labels.label(keys::YOU),
        Role::Assistant => ASSISTANT_NAME.to_string(),
    };
    let prefix = format!("[{}] {}: ", message.timestamp, who);
    let indent = " ".repeat(prefix.chars().count());

    render_text(&message.text)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{prefix}{line}")
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One message as an HTML list item, safe to embed in a page
pub fn transcript_html(message: &Message) -> String {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    format!(
        "<li class=\"{role}\" id=\"msg-{}\"><time>{}</time> {}</li>",
        message.id,
        message.timestamp,
        markup::to_html(&message.text)
    )
}

fn print_suggestions(widget: &ChatWidget, labels: &dyn TextProvider) {
    let suggestions = widget.suggestions();
    if suggestions.is_empty() {
        return;
    }
    println!("{}:", labels.label(keys::SUGGESTIONS));
    for (i, s) in suggestions.iter().enumerate() {
        println!("  /suggest {} → {}", i + 1, s);
    }
}

fn print_transcript(widget: &ChatWidget, labels: &dyn TextProvider) {
    println!("{BOLD}── {} ──{RESET}", labels.label(keys::TITLE));
    for message in widget.messages() {
        println!("{}", render_message(&message, labels));
    }
    print_suggestions(widget, labels);
    if widget.is_awaiting_response() {
        println!("{}", labels.label(keys::TYPING));
    }
    println!("({})", labels.label(keys::PLACEHOLDER));
}

async fn render_events(
    widget: ChatWidget,
    mut events: broadcast::Receiver<WidgetEvent>,
    labels: Arc<dyn TextProvider>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match event {
            // Reprint so the latest message is in view, then prompt for input
            WidgetEvent::Opened => print_transcript(&widget, labels.as_ref()),
            WidgetEvent::Closed => println!("{}", labels.label(keys::CLOSED)),
            WidgetEvent::MessageAppended(message) => {
                if message.role == Role::Assistant && widget.is_visible() {
                    println!("{}", render_message(&message, labels.as_ref()));
                }
            }
            WidgetEvent::TypingChanged(true) if widget.is_visible() => {
                println!("{}", labels.label(keys::TYPING));
            }
            WidgetEvent::TypingChanged(_) => {}
            WidgetEvent::UnreadChanged(true) => {
                println!("{BOLD}●{RESET} {}", labels.label(keys::UNREAD));
            }
            WidgetEvent::UnreadChanged(false) => {}
            WidgetEvent::Reset(greeting) => {
                println!("{}", labels.label(keys::RESET));
                if widget.is_visible() {
                    println!("{}", render_message(&greeting, labels.as_ref()));
                    print_suggestions(&widget, labels.as_ref());
                }
            }
        }
    }
}

/// Run the interactive session until `/quit` or end of input
pub async fn run(widget: ChatWidget, labels: Arc<dyn TextProvider>) -> anyhow::Result<()> {
    let renderer = tokio::spawn(render_events(
        widget.clone(),
        widget.subscribe(),
        labels.clone(),
    ));

    println!("{}", labels.label(keys::CLOSED));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = None;

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Open => widget.open(),
            Command::Close => widget.close(),
            Command::Reset => widget.reset(),
            Command::Suggest(n) => match widget.suggestions().get(n - 1) {
                Some(text) => {
                    if let Some(pending) = widget.select_suggestion(text) {
                        in_flight = Some(pending);
                    }
                }
                None => println!("No quick question #{n}"),
            },
            Command::State => println!("{}", serde_json::to_string_pretty(&widget.snapshot())?),
            Command::Html => {
                for message in widget.messages() {
                    println!("{}", transcript_html(&message));
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Unknown(cmd) => println!("Unknown command: {cmd}. Type /help."),
            Command::Say(text) => {
                widget.set_pending_input(text.as_str());
                if let Some(pending) = widget.submit(&text) {
                    in_flight = Some(pending);
                }
            }
        }
    }

    // Let a reply already on its way land before leaving
    if let Some(pending) = in_flight {
        pending.delivered().await;
    }
    tokio::task::yield_now().await;
    renderer.abort();

    tracing::info!(
        messages = widget.message_count(),
        unread = widget.has_unseen_reply(),
        "Session ended"
    );
    Ok(())
}
