//! Mock implementations for testing
//!
//! These mocks drive the runtime end to end without a network or a terminal.

use super::{Frontend, RuntimeError, RuntimeOptions, SessionRuntime};
use crate::eliza::{Conversation, ElizaService, RpcError};
use crate::state_machine::{Event, Session};
use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

// ============================================================================
// Mock ELIZA Service
// ============================================================================

/// Mock service answering from queued results
pub struct MockElizaService {
    introductions: Mutex<VecDeque<Result<Vec<String>, RpcError>>>,
    replies: Arc<Mutex<VecDeque<Result<String, RpcError>>>>,
    open_error: Mutex<Option<RpcError>>,
    /// When set, every call waits for `release` before answering
    gate: Option<Arc<Notify>>,
    /// Names passed to `introduce`
    pub introduced: Mutex<Vec<String>>,
    /// Sentences passed to any opened conversation
    pub said: Arc<Mutex<Vec<String>>>,
    pub conversations_opened: AtomicUsize,
}

impl MockElizaService {
    pub fn new() -> Self {
        Self {
            introductions: Mutex::new(VecDeque::new()),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            open_error: Mutex::new(None),
            gate: None,
            introduced: Mutex::new(Vec::new()),
            said: Arc::new(Mutex::new(Vec::new())),
            conversations_opened: AtomicUsize::new(0),
        }
    }

    /// Hold every call until `release` is called once per call
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn queue_introduction(&self, lines: &[&str]) {
        self.introductions
            .lock()
            .unwrap()
            .push_back(Ok(lines.iter().map(ToString::to_string).collect()));
    }

    pub fn queue_introduction_error(&self, error: RpcError) {
        self.introductions.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_reply(&self, sentence: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(sentence.to_string()));
    }

    pub fn queue_reply_error(&self, error: RpcError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_open(&self, error: RpcError) {
        *self.open_error.lock().unwrap() = Some(error);
    }

    pub fn introduced_names(&self) -> Vec<String> {
        self.introduced.lock().unwrap().clone()
    }

    pub fn said_sentences(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.conversations_opened.load(Ordering::SeqCst)
    }
}

impl Default for MockElizaService {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_at(gate: Option<&Arc<Notify>>) {
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

#[async_trait]
impl ElizaService for MockElizaService {
    async fn introduce(&self, name: &str) -> Result<Vec<String>, RpcError> {
        self.introduced.lock().unwrap().push(name.to_string());
        wait_at(self.gate.as_ref()).await;
        self.introductions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RpcError::unavailable("No mock introduction queued")))
    }

    async fn open_conversation(&self) -> Result<Box<dyn Conversation>, RpcError> {
        if let Some(error) = self.open_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.conversations_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConversation {
            replies: Arc::clone(&self.replies),
            said: Arc::clone(&self.said),
            gate: self.gate.clone(),
        }))
    }
}

struct MockConversation {
    replies: Arc<Mutex<VecDeque<Result<String, RpcError>>>>,
    said: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl Conversation for MockConversation {
    async fn say(&mut self, sentence: &str) -> Result<String, RpcError> {
        self.said.lock().unwrap().push(sentence.to_string());
        wait_at(self.gate.as_ref()).await;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RpcError::unavailable("No mock reply queued")))
    }
}

// ============================================================================
// Recording Frontend
// ============================================================================

/// Frontend that keeps every painted frame
#[derive(Clone, Default)]
pub struct RecordingFrontend {
    pub frames: Arc<Mutex<Vec<String>>>,
}

impl Frontend for RecordingFrontend {
    fn draw(&mut self, view: &str) -> io::Result<()> {
        self.frames.lock().unwrap().push(view.to_string());
        Ok(())
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

/// Helper for driving a spawned runtime with minimal boilerplate
pub struct TestRuntime {
    pub service: Arc<MockElizaService>,
    pub frames: Arc<Mutex<Vec<String>>>,
    input_tx: mpsc::Sender<io::Result<Event>>,
    handle: JoinHandle<Result<Session, RuntimeError>>,
}

impl TestRuntime {
    pub fn new() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }
}

pub struct TestRuntimeBuilder {
    service: Option<MockElizaService>,
    options: RuntimeOptions,
}

impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            service: None,
            options: RuntimeOptions {
                reply_delay: Duration::ZERO,
                tick_interval: Duration::from_millis(100),
            },
        }
    }

    pub fn service(mut self, service: MockElizaService) -> Self {
        self.service = Some(service);
        self
    }

    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.options.reply_delay = delay;
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.options.tick_interval = interval;
        self
    }

    pub fn build(self) -> TestRuntime {
        let service = Arc::new(self.service.unwrap_or_default());
        let frontend = RecordingFrontend::default();
        let frames = Arc::clone(&frontend.frames);
        let (input_tx, input_rx) = mpsc::channel(64);

        let runtime = SessionRuntime::new(Arc::clone(&service), frontend, self.options);
        let handle = tokio::spawn(runtime.run(ReceiverStream::new(input_rx)));

        TestRuntime {
            service,
            frames,
            input_tx,
            handle,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRuntime {
    pub async fn send(&self, event: Event) {
        self.input_tx
            .send(Ok(event))
            .await
            .expect("Failed to send event");
    }

    pub async fn type_text(&self, text: &str) {
        for c in text.chars() {
            self.send(Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)))
                .await;
        }
    }

    /// Type a line and press Enter
    pub async fn submit(&self, text: &str) {
        self.type_text(text).await;
        self.send(Event::Submit).await;
    }

    pub fn last_frame(&self) -> String {
        self.frames.lock().unwrap().last().cloned().unwrap_or_default()
    }

    /// Wait until the latest painted frame satisfies `predicate`
    pub async fn wait_for_view(&self, predicate: impl Fn(&str) -> bool, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if predicate(&self.last_frame()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    /// Wait until every input event sent so far has been processed.
    /// A resize always repaints, so a new frame marks the point.
    pub async fn flush(&self) -> bool {
        let painted = self.frames.lock().unwrap().len();
        self.send(Event::Resize {
            width: 80,
            height: 24,
        })
        .await;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if self.frames.lock().unwrap().len() > painted {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    /// Quit and hand back the final session
    pub async fn quit(self) -> Session {
        self.send(Event::Quit).await;
        self.handle
            .await
            .expect("Runtime task panicked")
            .expect("Runtime failed")
    }

    /// Close the input stream and wait for the runtime to stop
    pub async fn close_input(self) -> Result<Session, RuntimeError> {
        drop(self.input_tx);
        self.handle.await.expect("Runtime task panicked")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eliza::Code;
    use crate::state_machine::{Exchange, Phase, Reply};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(2);
    const NAME_PROMPT: &str = "Let's introduce you! - what's your name?";

    #[tokio::test]
    async fn test_mock_service() {
        let mock = MockElizaService::new();
        mock.queue_introduction(&["Hello Ann"]);
        mock.queue_reply("Go on");

        assert_eq!(mock.introduce("Ann").await.unwrap(), vec!["Hello Ann"]);
        assert!(mock.introduce("Ann").await.is_err());

        let mut conversation = mock.open_conversation().await.unwrap();
        assert_eq!(conversation.say("hi").await.unwrap(), "Go on");
        assert_eq!(
            conversation.say("again").await.unwrap_err().code,
            Code::Unavailable
        );
        assert_eq!(mock.said_sentences(), vec!["hi", "again"]);
        assert_eq!(mock.opened(), 1);
    }

    #[tokio::test]
    async fn test_initial_frame_prompts_for_name() {
        let rt = TestRuntime::new().build();
        assert!(
            rt.wait_for_view(|v| v.starts_with(NAME_PROMPT) && v.contains("Joseph Weizenbaum"), WAIT)
                .await
        );
        let session = rt.quit().await;
        assert_eq!(session.phase, Phase::AwaitingName);
    }

    /// Integration test: introduction then one conversational turn
    #[tokio::test]
    async fn test_happy_path() {
        let service = MockElizaService::new();
        service.queue_introduction(&["Hello Alice, I'm ELIZA.", "How are you feeling today?"]);
        service.queue_reply("I see. You said: \"I feel fine\". Tell me more.");

        let rt = TestRuntime::new().service(service).build();
        rt.submit("Alice").await;
        assert!(
            rt.wait_for_view(|v| v.starts_with("Eliza: Hello Alice, I'm ELIZA.\n"), WAIT)
                .await
        );

        rt.submit("I feel fine").await;
        assert!(
            rt.wait_for_view(
                |v| v.contains("Alice: I feel fine\nEliza: I see. You said: \"I feel fine\". Tell me more.\n"),
                WAIT
            )
            .await
        );

        let service = Arc::clone(&rt.service);
        let session = rt.quit().await;
        assert_eq!(session.phase, Phase::AwaitingLine);
        assert_eq!(session.user_name, "Alice");
        assert_eq!(session.introduction.len(), 2);
        assert_eq!(
            session.transcript,
            vec![Exchange {
                said: "I feel fine".to_string(),
                reply: Reply::Received(
                    "I see. You said: \"I feel fine\". Tell me more.".to_string()
                ),
            }]
        );
        assert_eq!(service.introduced_names(), vec!["Alice"]);
        assert_eq!(service.said_sentences(), vec!["I feel fine"]);
    }

    #[tokio::test]
    async fn test_conversation_channel_opened_once() {
        let service = MockElizaService::new();
        service.queue_introduction(&["Hi Bob"]);
        service.queue_reply("one");
        service.queue_reply("two");
        service.queue_reply("three");

        let rt = TestRuntime::new().service(service).build();
        rt.submit("Bob").await;
        assert!(rt.wait_for_view(|v| v.starts_with("Eliza: Hi Bob"), WAIT).await);

        for (line, reply) in [("a", "one"), ("b", "two"), ("c", "three")] {
            rt.submit(line).await;
            let expected = format!("Bob: {line}\nEliza: {reply}\n");
            assert!(rt.wait_for_view(|v| v.contains(&expected), WAIT).await);
        }

        let service = Arc::clone(&rt.service);
        let session = rt.quit().await;
        assert_eq!(session.transcript.len(), 3);
        assert_eq!(service.opened(), 1);
    }

    #[tokio::test]
    async fn test_introduction_failure_renders_error() {
        let service = MockElizaService::new();
        service.queue_introduction_error(RpcError::new(Code::Unknown, "introduce error"));

        let rt = TestRuntime::new().service(service).build();
        rt.submit("Carol").await;
        assert!(
            rt.wait_for_view(|v| v == "An error occurred: unknown: introduce error", WAIT)
                .await
        );

        // Input is absorbed once failed
        rt.submit("more").await;

        let service = Arc::clone(&rt.service);
        let session = rt.quit().await;
        assert_eq!(session.phase, Phase::Failed);
        assert!(session.user_name.is_empty());
        assert_eq!(service.introduced_names(), vec!["Carol"]);
        assert_eq!(service.opened(), 0);
    }

    #[tokio::test]
    async fn test_conversation_failure_keeps_line() {
        let service = MockElizaService::new();
        service.queue_introduction(&["Hi Dave"]);
        service.queue_reply_error(RpcError::new(Code::Unknown, "converse error"));

        let rt = TestRuntime::new().service(service).build();
        rt.submit("Dave").await;
        assert!(rt.wait_for_view(|v| v.starts_with("Eliza: Hi Dave"), WAIT).await);

        rt.submit("hello").await;
        assert!(
            rt.wait_for_view(|v| v == "An error occurred: unknown: converse error", WAIT)
                .await
        );

        let session = rt.quit().await;
        assert_eq!(session.phase, Phase::Failed);
        assert_eq!(
            session.transcript,
            vec![Exchange {
                said: "hello".to_string(),
                reply: Reply::Failed,
            }]
        );
    }

    #[tokio::test]
    async fn test_open_failure_is_a_converse_failure() {
        let service = MockElizaService::new();
        service.queue_introduction(&["Hi Erin"]);
        service.fail_open(RpcError::unavailable("connection refused"));

        let rt = TestRuntime::new().service(service).build();
        rt.submit("Erin").await;
        assert!(rt.wait_for_view(|v| v.starts_with("Eliza: Hi Erin"), WAIT).await);

        rt.submit("hello").await;
        assert!(
            rt.wait_for_view(
                |v| v == "An error occurred: unavailable: connection refused",
                WAIT
            )
            .await
        );
        assert_eq!(rt.quit().await.phase, Phase::Failed);
    }

    #[tokio::test]
    async fn test_submit_ignored_while_waiting() {
        let service = MockElizaService::new().gated();
        service.queue_introduction(&["Hi Frank"]);

        let rt = TestRuntime::new().service(service).build();
        rt.submit("Frank").await;
        assert!(
            rt.wait_for_view(|v| v.starts_with(NAME_PROMPT) && !v.contains("> "), WAIT)
                .await
        );

        // Typing and pressing Enter while the call is outstanding do nothing
        rt.submit("Again").await;
        assert!(rt.flush().await);
        rt.service.release();
        assert!(rt.wait_for_view(|v| v.starts_with("Eliza: Hi Frank"), WAIT).await);
        assert!(rt.last_frame().ends_with("> █"));

        let service = Arc::clone(&rt.service);
        let session = rt.quit().await;
        assert_eq!(service.introduced_names(), vec!["Frank"]);
        assert_eq!(session.user_name, "Frank");
        assert_eq!(session.input.value(), "");
    }

    #[tokio::test]
    async fn test_spinner_animates_while_waiting() {
        let service = MockElizaService::new().gated();
        let rt = TestRuntime::new()
            .service(service)
            .tick_interval(Duration::from_millis(10))
            .build();

        rt.submit("Grace").await;
        for frame in ["|", "/", "-", "\\"] {
            let expected = format!("{NAME_PROMPT}\n\n{frame}");
            assert!(rt.wait_for_view(|v| v == expected, WAIT).await, "spinner never showed {frame}");
        }

        let session = rt.quit().await;
        assert_eq!(
            session.phase,
            Phase::Introducing {
                name: "Grace".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_reply_delay_applies_to_converse_only() {
        let delay = Duration::from_millis(400);
        let service = MockElizaService::new();
        service.queue_introduction(&["Hi Heidi"]);
        service.queue_reply("Tell me more.");

        let rt = TestRuntime::new().service(service).reply_delay(delay).build();

        let started = Instant::now();
        rt.submit("Heidi").await;
        assert!(rt.wait_for_view(|v| v.starts_with("Eliza: Hi Heidi"), WAIT).await);
        assert!(started.elapsed() < delay);

        let started = Instant::now();
        rt.submit("ok").await;
        assert!(
            rt.wait_for_view(|v| v.contains("Eliza: Tell me more.\n"), WAIT)
                .await
        );
        assert!(started.elapsed() >= delay);
        rt.quit().await;
    }

    #[tokio::test]
    async fn test_quit_while_call_outstanding() {
        let service = MockElizaService::new().gated();
        service.queue_introduction(&["Hi Ivan"]);
        service.queue_reply("never delivered");

        let rt = TestRuntime::new().service(service).build();
        rt.submit("Ivan").await;
        rt.service.release();
        assert!(rt.wait_for_view(|v| v.starts_with("Eliza: Hi Ivan"), WAIT).await);

        rt.submit("hello").await;
        assert!(rt.wait_for_view(|v| !v.contains("> "), WAIT).await);

        let session = rt.quit().await;
        assert_eq!(session.phase, Phase::Conversing);
        assert_eq!(session.transcript, vec![Exchange::pending("hello")]);
    }

    #[tokio::test]
    async fn test_input_closed_is_an_error() {
        let rt = TestRuntime::new().build();
        let result = rt.close_input().await;
        assert!(matches!(result, Err(RuntimeError::InputClosed)));
    }

    #[tokio::test]
    async fn test_resize_forces_redraw() {
        let rt = TestRuntime::new().build();
        assert!(rt.wait_for_view(|v| v.starts_with(NAME_PROMPT), WAIT).await);
        let painted = rt.frames.lock().unwrap().len();

        assert!(rt.flush().await);
        let frames = rt.frames.lock().unwrap().clone();
        assert_eq!(frames.len(), painted + 1);
        assert_eq!(frames[painted], frames[painted - 1]);
        rt.quit().await;
    }

    #[test]
    fn test_terminal_frontend_paints_view() {
        let mut terminal = Terminal::new(TestBackend::new(48, 4)).unwrap();
        Frontend::draw(&mut terminal, &format!("{NAME_PROMPT}\n\n> █")).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(text.starts_with(NAME_PROMPT));
        assert!(text.contains("> █"));
    }
}
