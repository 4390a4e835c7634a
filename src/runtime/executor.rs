//! Session runtime executor

use super::{Frontend, RuntimeError, RuntimeOptions};
use crate::eliza::{ConverseChannel, ElizaService};
use crate::state_machine::{transition, Call, Effect, Event, Session};
use crate::view;
use futures::{Stream, StreamExt};
use std::io;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;

/// At most one call is outstanding, so results never queue up
const RESULT_BUFFER: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Drives one session from the first prompt until the user quits
pub struct SessionRuntime<S, F>
where
    S: ElizaService + 'static,
    F: Frontend,
{
    session: Session,
    service: Arc<S>,
    /// Shared with converse workers; opened on the first turn
    channel: Arc<Mutex<ConverseChannel<S>>>,
    options: RuntimeOptions,
    frontend: F,
    result_tx: mpsc::Sender<Event>,
    result_rx: mpsc::Receiver<Event>,
    last_view: Option<String>,
}

impl<S, F> SessionRuntime<S, F>
where
    S: ElizaService + 'static,
    F: Frontend,
{
    pub fn new(service: S, frontend: F, options: RuntimeOptions) -> Self {
        let service = Arc::new(service);
        let channel = Arc::new(Mutex::new(ConverseChannel::new(Arc::clone(&service))));
        let (result_tx, result_rx) = mpsc::channel(RESULT_BUFFER);
        Self {
            session: Session::new(),
            service,
            channel,
            options,
            frontend,
            result_tx,
            result_rx,
            last_view: None,
        }
    }

    /// Run until a `Quit` effect. Returns the final session.
    pub async fn run<I>(mut self, mut input: I) -> Result<Session, RuntimeError>
    where
        I: Stream<Item = io::Result<Event>> + Unpin,
    {
        tracing::info!("Starting session runtime");
        self.redraw(false)?;

        let mut ticker = tokio::time::interval(self.options.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            let event = tokio::select! {
                Some(event) = self.result_rx.recv() => event,
                item = input.next() => match item {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => return Err(RuntimeError::Input(e)),
                    None => return Err(RuntimeError::InputClosed),
                },
                _ = ticker.tick() => Event::Tick,
            };

            if self.process_event(event)? == Flow::Quit {
                break;
            }
        }

        tracing::info!(
            phase = ?self.session.phase,
            exchanges = self.session.transcript.len(),
            "Session runtime stopped"
        );
        Ok(self.session)
    }

    fn process_event(&mut self, event: Event) -> Result<Flow, RuntimeError> {
        let resized = if let Event::Resize { width, height } = &event {
            tracing::debug!(width, height, "Terminal resized");
            true
        } else {
            false
        };

        let result = match transition(&self.session, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, phase = ?self.session.phase, "Ignoring event");
                return Ok(Flow::Continue);
            }
        };

        if result.new_session.phase != self.session.phase {
            tracing::debug!(
                from = ?self.session.phase,
                to = ?result.new_session.phase,
                "Phase changed"
            );
        }
        self.session = result.new_session;

        if let Some(effect) = result.effect {
            if self.execute_effect(effect) == Flow::Quit {
                return Ok(Flow::Quit);
            }
        }

        self.redraw(resized)?;
        Ok(Flow::Continue)
    }

    fn execute_effect(&self, effect: Effect) -> Flow {
        match effect {
            Effect::Introduce { name } => {
                let service = Arc::clone(&self.service);
                let result_tx = self.result_tx.clone();

                tokio::spawn(async move {
                    let event = match service.introduce(&name).await {
                        Ok(lines) => Event::IntroduceResolved { lines },
                        Err(error) => Event::CallFailed {
                            call: Call::Introduce,
                            error,
                        },
                    };
                    let _ = result_tx.send(event).await;
                });
                Flow::Continue
            }

            Effect::Converse { sentence } => {
                let channel = Arc::clone(&self.channel);
                let result_tx = self.result_tx.clone();
                let delay = self.options.reply_delay;

                tokio::spawn(async move {
                    let result = channel.lock().await.turn(&sentence).await;
                    let event = match result {
                        Ok(reply) => {
                            tokio::time::sleep(delay).await;
                            Event::ConverseResolved { sentence: reply }
                        }
                        Err(error) => Event::CallFailed {
                            call: Call::Converse,
                            error,
                        },
                    };
                    let _ = result_tx.send(event).await;
                });
                Flow::Continue
            }

            Effect::Quit => Flow::Quit,
        }
    }

    /// Paint only when the view changed, or unconditionally after a resize
    fn redraw(&mut self, force: bool) -> Result<(), RuntimeError> {
        let rendered = view::render(&self.session);
        if !force && self.last_view.as_deref() == Some(rendered.as_str()) {
            return Ok(());
        }
        self.frontend
            .draw(&rendered)
            .map_err(RuntimeError::Terminal)?;
        self.last_view = Some(rendered);
        Ok(())
    }
}
