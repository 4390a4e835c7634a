//! ELIZA service client
//!
//! The state machine only sees two operations: a fully drained introduction
//! and one conversational round trip. Everything about framing and transport
//! stays behind the `ElizaService` and `Conversation` traits.

mod connect;
mod envelope;
mod error;
pub mod types;


pub use connect::{ConnectClient, ConverseMode};
#[allow(unused_imports)] // Code is used by tests
pub use error::{Code, RpcError};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Remote operations consumed by the session runtime
#[async_trait]
pub trait ElizaService: Send + Sync {
    /// Introduce the user. Resolves only once every streamed line has arrived.
    async fn introduce(&self, name: &str) -> Result<Vec<String>, RpcError>;

    /// Open a channel for conversational round trips
    async fn open_conversation(&self) -> Result<Box<dyn Conversation>, RpcError>;
}

/// An open conversation: one sentence out, one sentence back
#[async_trait]
pub trait Conversation: Send {
    async fn say(&mut self, sentence: &str) -> Result<String, RpcError>;
}

#[async_trait]
impl<T: ElizaService + ?Sized> ElizaService for Arc<T> {
    async fn introduce(&self, name: &str) -> Result<Vec<String>, RpcError> {
        (**self).introduce(name).await
    }

    async fn open_conversation(&self) -> Result<Box<dyn Conversation>, RpcError> {
        (**self).open_conversation().await
    }
}

/// Lazily-opened conversation that is reused for every round trip.
///
/// The first turn opens the channel. A turn that fails drops the channel, so
/// a broken stream is never written to again.
pub struct ConverseChannel<S: ElizaService> {
    service: Arc<S>,
    conversation: Option<Box<dyn Conversation>>,
}

impl<S: ElizaService> ConverseChannel<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            conversation: None,
        }
    }

    #[allow(dead_code)] // Used by tests
    pub fn is_open(&self) -> bool {
        self.conversation.is_some()
    }

    /// One round trip. Open and send/receive failures share one error type.
    pub async fn turn(&mut self, sentence: &str) -> Result<String, RpcError> {
        let mut conversation = match self.conversation.take() {
            Some(conversation) => conversation,
            None => {
                tracing::debug!("Opening conversation channel");
                self.service.open_conversation().await?
            }
        };

        let result = conversation.say(sentence).await;
        if result.is_ok() {
            self.conversation = Some(conversation);
        }
        result
    }
}

/// Logging wrapper for ELIZA services
pub struct LoggingService<S> {
    inner: S,
}

impl<S: ElizaService> LoggingService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ElizaService> ElizaService for LoggingService<S> {
    async fn introduce(&self, name: &str) -> Result<Vec<String>, RpcError> {
        let start = Instant::now();
        let result = self.inner.introduce(name).await;
        let duration = start.elapsed();

        match &result {
            Ok(lines) => tracing::info!(
                duration_ms = %duration.as_millis(),
                lines = lines.len(),
                "Introduce completed"
            ),
            Err(e) => tracing::error!(
                duration_ms = %duration.as_millis(),
                code = %e.code,
                error = %e.message,
                cause = ?e.cause,
                "Introduce failed"
            ),
        }
        result
    }

    async fn open_conversation(&self) -> Result<Box<dyn Conversation>, RpcError> {
        match self.inner.open_conversation().await {
            Ok(inner) => Ok(Box::new(LoggingConversation { inner, turn: 0 })),
            Err(e) => {
                tracing::error!(code = %e.code, error = %e.message, cause = ?e.cause, "Failed to open conversation");
                Err(e)
            }
        }
    }
}

struct LoggingConversation {
    inner: Box<dyn Conversation>,
    turn: u32,
}

#[async_trait]
impl Conversation for LoggingConversation {
    async fn say(&mut self, sentence: &str) -> Result<String, RpcError> {
        self.turn += 1;
        let start = Instant::now();
        let result = self.inner.say(sentence).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => tracing::info!(
                turn = self.turn,
                duration_ms = %duration.as_millis(),
                "Conversation turn completed"
            ),
            Err(e) => tracing::error!(
                turn = self.turn,
                duration_ms = %duration.as_millis(),
                code = %e.code,
                error = %e.message,
                cause = ?e.cause,
                "Conversation turn failed"
            ),
        }
        result
    }
}
