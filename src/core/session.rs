//! Chat widget session controller
//!
//! The `ChatWidget` owns everything the UI shows about the assistant:
//! 1. Whether the chat surface is open
//! 2. The ordered message log, starting with a greeting
//! 3. The typing indicator while a reply is being "thought about"
//! 4. The unread badge for replies that arrive while the surface is hidden
//!
//! Replies are produced by a spawned task that sleeps for a sampled delay and
//! then asks the [`Responder`]. The task is never cancelled: closing, reopening
//! or resetting the widget does not stop it, and the reply lands after whatever
//! the log holds at delivery time. Only one exchange can be in flight, so at most
//! one reply can trail a reset.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{rules_builtin, ResponseDelay};
use crate::conversation::Message;
use crate::intent::Responder;

/// Capacity of the event channel; slow renderers see `Lagged` past this
const EVENT_CAPACITY: usize = 64;

/// Mutable widget state, guarded by the widget
#[derive(Debug)]
struct SessionState {
    visible: bool,
    messages: Vec<Message>,
    pending_input: String,
    awaiting_response: bool,
    has_unseen_reply: bool,
}

impl SessionState {
    fn new(greeting: &str) -> Self {
        Self {
            visible: false,
            messages: vec![Message::assistant(greeting)],
            pending_input: String::new(),
            awaiting_response: false,
            has_unseen_reply: false,
        }
    }
}

/// Point-in-time view of the widget for renderers
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub visible: bool,
    pub messages: Vec<Message>,
    pub pending_input: String,
    pub awaiting_response: bool,
    pub has_unseen_reply: bool,
    pub suggestions_visible: bool,
}

/// State changes pushed to the rendering layer
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    /// Surface shown; the view should scroll to the latest message and focus input
    Opened,
    Closed,
    MessageAppended(Message),
    /// Typing indicator on/off
    TypingChanged(bool),
    /// Unread badge on/off
    UnreadChanged(bool),
    /// Log replaced by a fresh greeting
    Reset(Message),
}

/// Handle to a scheduled reply
#[derive(Debug)]
pub struct PendingReply {
    handle: JoinHandle<()>,
}

impl PendingReply {
    /// Wait until the reply has been appended to the log
    pub async fn delivered(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Reply task failed");
        }
    }
}

/// The assistant's conversation surface
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ChatWidget {
    state: Arc<Mutex<SessionState>>,
    responder: Arc<dyn Responder>,
    delay: ResponseDelay,
    greeting: Arc<str>,
    suggestions: Arc<[String]>,
    events: broadcast::Sender<WidgetEvent>,
}

impl ChatWidget {
    /// Create a hidden widget holding only the greeting
    pub fn new(responder: Arc<dyn Responder>, delay: ResponseDelay) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SessionState::new(rules_builtin::GREETING))),
            responder,
            delay,
            greeting: Arc::from(rules_builtin::GREETING),
            suggestions: rules_builtin::SUGGESTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            events,
        }
    }

    /// Set a custom greeting, replacing the current log
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        let greeting: String = greeting.into();
        self.greeting = Arc::from(greeting.as_str());
        self.state = Arc::new(Mutex::new(SessionState::new(&greeting)));
        self
    }

    /// Set the quick replies shown under the greeting
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions.into();
        self
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is fine; state stays queryable via snapshot()
        let _ = self.events.send(event);
    }

    /// Show the surface and clear the unread badge
    pub fn open(&self) {
        let had_unread = {
            let mut state = self.state.lock();
            state.visible = true;
            std::mem::take(&mut state.has_unseen_reply)
        };

        tracing::debug!(had_unread, "Chat opened");
        self.emit(WidgetEvent::Opened);
        if had_unread {
            self.emit(WidgetEvent::UnreadChanged(false));
        }
    }

    /// Hide the surface; history is kept
    pub fn close(&self) {
        self.state.lock().visible = false;
        tracing::debug!("Chat closed");
        self.emit(WidgetEvent::Closed);
    }

    /// Stage draft text in the input box
    pub fn set_pending_input(&self, text: impl Into<String>) {
        self.state.lock().pending_input = text.into();
    }

    /// Post a user message and schedule the assistant's reply
    ///
    /// Returns `None` without touching state when `text` is blank or a reply is
    /// still pending. Must be called from within a Tokio runtime.
    pub fn submit(&self, text: &str) -> Option<PendingReply> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let message = {
            let mut state = self.state.lock();
            if state.awaiting_response {
                tracing::debug!("Submission ignored: reply still pending");
                return None;
            }
            let message = Message::user(trimmed);
            state.messages.push(message.clone());
            state.pending_input.clear();
            state.awaiting_response = true;
            message
        };

        self.emit(WidgetEvent::MessageAppended(message));
        self.emit(WidgetEvent::TypingChanged(true));

        let delay = self.delay.sample();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Reply scheduled");

        let widget = self.clone();
        let input = text.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            widget.deliver(&input);
        });

        Some(PendingReply { handle })
    }

    /// Quick-reply affordance; same as typing the text
    pub fn select_suggestion(&self, text: &str) -> Option<PendingReply> {
        self.submit(text)
    }

    fn deliver(&self, input: &str) {
        let reply = Message::assistant(self.responder.respond(input));

        let unread = {
            let mut state = self.state.lock();
            state.messages.push(reply.clone());
            state.awaiting_response = false;
            if !state.visible {
                state.has_unseen_reply = true;
            }
            !state.visible
        };

        tracing::debug!(unread, "Reply delivered");
        self.emit(WidgetEvent::MessageAppended(reply));
        self.emit(WidgetEvent::TypingChanged(false));
        if unread {
            self.emit(WidgetEvent::UnreadChanged(true));
        }
    }

    /// Start over from a fresh greeting
    ///
    /// A reply already in flight still arrives and is appended after the greeting.
    pub fn reset(&self) {
        let greeting = Message::assistant(self.greeting.as_ref());
        {
            let mut state = self.state.lock();
            state.messages = vec![greeting.clone()];
        }

        tracing::info!("Conversation reset");
        self.emit(WidgetEvent::Reset(greeting));
    }

    /// Quick replies, offered only while the log holds just the greeting
    pub fn suggestions(&self) -> Vec<String> {
        if self.state.lock().messages.len() <= 1 {
            self.suggestions.to_vec()
        } else {
            Vec::new()
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            visible: state.visible,
            messages: state.messages.clone(),
            pending_input: state.pending_input.clone(),
            awaiting_response: state.awaiting_response,
            has_unseen_reply: state.has_unseen_reply,
            suggestions_visible: state.messages.len() <= 1,
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.clone()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.state.lock().awaiting_response
    }

    pub fn has_unseen_reply(&self) -> bool {
        self.state.lock().has_unseen_reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleTable;
    use crate::conversation::Role;
    use crate::intent::{IntentMatcher, RuleBook};
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready};

    /// Replies with exactly what it was given
    struct Echo;

    impl Responder for Echo {
        fn respond(&self, input: &str) -> String {
            format!("echo:{input}")
        }
    }

    fn echo_widget() -> ChatWidget {
        ChatWidget::new(Arc::new(Echo), ResponseDelay::fixed(Duration::from_millis(10)))
    }

    fn skill_widget() -> ChatWidget {
        let matcher = IntentMatcher::new(RuleBook::compile(&RuleTable::builtin()).unwrap());
        ChatWidget::new(Arc::new(matcher), ResponseDelay::default())
    }

    #[test]
    fn test_starts_hidden_with_greeting() {
        let widget = echo_widget();
        let snapshot = widget.snapshot();

        assert!(!snapshot.visible);
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].role, Role::Assistant);
        assert_eq!(snapshot.messages[0].text, rules_builtin::GREETING);
        assert!(!snapshot.awaiting_response);
        assert!(!snapshot.has_unseen_reply);
        assert!(snapshot.suggestions_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_then_reply_after_delay() {
        let widget = skill_widget();
        widget.open();

        let pending = widget.submit("hello").unwrap();
        let messages = widget.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].text, "hello");
        assert!(widget.is_awaiting_response());

        // Shorter than the minimum delay: nothing yet
        tokio::time::sleep(Duration::from_millis(699)).await;
        assert_eq!(widget.message_count(), 2);
        assert!(widget.is_awaiting_response());

        pending.delivered().await;
        let messages = widget.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, Role::Assistant);
        assert!(messages[2].text.starts_with("Hello!"));
        assert!(!widget.is_awaiting_response());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_arrives_within_window() {
        let widget = skill_widget();
        let pending = widget.submit("How do I log in?").unwrap();

        let mut reply = tokio_test::task::spawn(pending.delivered());
        assert_pending!(reply.poll());

        tokio::time::sleep(Duration::from_millis(1250)).await;
        assert_ready!(reply.poll());
        assert!(widget.messages()[2].text.contains("**Logging in**"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_text_trimmed_but_responder_sees_raw_text() {
        let widget = echo_widget();
        widget.set_pending_input("  hi there  ");

        widget.submit("  hi there  ").unwrap().delivered().await;

        let snapshot = widget.snapshot();
        assert_eq!(snapshot.messages[1].text, "hi there");
        assert_eq!(snapshot.messages[2].text, "echo:  hi there  ");
        assert!(snapshot.pending_input.is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let widget = echo_widget();
        widget.set_pending_input("draft");

        assert!(widget.submit("").is_none());
        assert!(widget.submit("   ").is_none());
        assert!(widget.submit("\n\t").is_none());

        assert_eq!(widget.message_count(), 1);
        assert!(!widget.is_awaiting_response());
        assert_eq!(widget.snapshot().pending_input, "draft");
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_ignored_while_pending() {
        let widget = echo_widget();

        let pending = widget.submit("first").unwrap();
        assert!(widget.submit("second").is_none());
        assert!(widget.select_suggestion("third").is_none());
        assert_eq!(widget.message_count(), 2);

        pending.delivered().await;
        assert_eq!(widget.message_count(), 3);

        widget.submit("second").unwrap().delivered().await;
        let texts: Vec<_> = widget.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(
            texts[1..],
            ["first", "echo:first", "second", "echo:second"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unread_flag_lifecycle() {
        let widget = echo_widget();
        assert!(!widget.is_visible());

        widget.submit("ping").unwrap().delivered().await;
        assert!(widget.has_unseen_reply());

        widget.open();
        assert!(!widget.has_unseen_reply());
        assert!(widget.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_unread_when_visible() {
        let widget = echo_widget();
        widget.open();

        widget.submit("ping").unwrap().delivered().await;
        assert!(!widget.has_unseen_reply());
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_checked_at_delivery() {
        let widget = echo_widget();
        widget.open();

        let pending = widget.submit("ping").unwrap();
        widget.close();
        pending.delivered().await;
        assert!(widget.has_unseen_reply());

        // Hidden at submission, visible again at delivery
        let pending = widget.submit("again").unwrap();
        widget.open();
        widget.close();
        widget.open();
        pending.delivered().await;
        assert!(!widget.has_unseen_reply());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_keeps_history() {
        let widget = echo_widget();
        widget.open();
        widget.submit("keep me").unwrap().delivered().await;
        widget.close();

        assert!(!widget.is_visible());
        assert_eq!(widget.message_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_leaves_single_greeting() {
        let widget = echo_widget();
        for text in ["one", "two", "three"] {
            widget.submit(text).unwrap().delivered().await;
        }
        assert_eq!(widget.message_count(), 7);
        let old_greeting = widget.messages()[0].id;

        widget.reset();
        let messages = widget.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, rules_builtin::GREETING);
        assert_ne!(messages[0].id, old_greeting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_in_flight_survives_reset() {
        let widget = echo_widget();
        let pending = widget.submit("late").unwrap();

        widget.reset();
        assert_eq!(widget.message_count(), 1);
        assert!(widget.is_awaiting_response());

        pending.delivered().await;
        let messages = widget.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "echo:late");
        assert!(!widget.is_awaiting_response());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestions_only_under_greeting() {
        let widget = echo_widget().with_suggestions(vec!["How do I log in?".to_string()]);
        assert_eq!(widget.suggestions(), vec!["How do I log in?"]);

        widget
            .select_suggestion("How do I log in?")
            .unwrap()
            .delivered()
            .await;
        assert!(widget.suggestions().is_empty());
        assert!(!widget.snapshot().suggestions_visible);

        widget.reset();
        assert_eq!(widget.suggestions().len(), 1);
    }

    #[test]
    fn test_custom_greeting() {
        let widget = echo_widget().with_greeting("Welcome back!");
        assert_eq!(widget.messages()[0].text, "Welcome back!");
        widget.reset();
        assert_eq!(widget.messages()[0].text, "Welcome back!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_exchange() {
        let widget = echo_widget();
        let mut events = widget.subscribe();

        widget.submit("hi").unwrap().delivered().await;
        widget.open();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }

        assert!(matches!(&seen[0], WidgetEvent::MessageAppended(m) if m.text == "hi"));
        assert!(matches!(seen[1], WidgetEvent::TypingChanged(true)));
        assert!(matches!(&seen[2], WidgetEvent::MessageAppended(m) if m.text == "echo:hi"));
        assert!(matches!(seen[3], WidgetEvent::TypingChanged(false)));
        assert!(matches!(seen[4], WidgetEvent::UnreadChanged(true)));
        assert!(matches!(seen[5], WidgetEvent::Opened));
        assert!(matches!(seen[6], WidgetEvent::UnreadChanged(false)));
        assert_eq!(seen.len(), 7);
    }
}
