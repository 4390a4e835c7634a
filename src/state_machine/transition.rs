//! Pure state transition function
//!
//! Given the same session and event this always produces the same result and
//! performs no I/O. Remote calls are requested as effects.

use super::state::{Exchange, Phase, Reply, Session};
use super::{Call, Effect, Event};
use crate::eliza::RpcError;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub effect: Option<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            new_session: session,
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// Errors that can occur during transition. The session is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A remote call is in flight, input is disabled")]
    CallInFlight,
    #[error("Nothing to submit")]
    EmptySubmission,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(session: &Session, event: Event) -> Result<TransitionResult, TransitionError> {
    match (&session.phase, event) {
        // ============================================================
        // Events accepted in every phase
        // ============================================================
        (_, Event::Quit) => Ok(TransitionResult::new(session.clone()).with_effect(Effect::Quit)),

        // The spinner keeps counting even while hidden
        (_, Event::Tick) => {
            let mut next = session.clone();
            next.spinner.tick();
            Ok(TransitionResult::new(next))
        }

        // Widgets have a fixed width; the frontend reflows on redraw
        (_, Event::Resize { .. }) => Ok(TransitionResult::new(session.clone())),

        // ============================================================
        // Failed absorbs all input
        // ============================================================
        (Phase::Failed, Event::Submit | Event::Key(_)) => Ok(TransitionResult::new(session.clone())),

        // ============================================================
        // Submission
        // ============================================================
        (Phase::Introducing { .. } | Phase::Conversing, Event::Submit) => {
            Err(TransitionError::CallInFlight)
        }

        // AwaitingName + Submit -> Introducing
        (Phase::AwaitingName, Event::Submit) => {
            let name = submitted_text(session)?;
            let mut next = session.clone();
            next.input.reset();
            next.input.set_placeholder("");
            next.input.blur();
            next.phase = Phase::Introducing { name: name.clone() };
            Ok(TransitionResult::new(next).with_effect(Effect::Introduce { name }))
        }

        // AwaitingLine + Submit -> Conversing
        (Phase::AwaitingLine, Event::Submit) => {
            let sentence = submitted_text(session)?;
            let mut next = session.clone();
            next.transcript.push(Exchange::pending(sentence.clone()));
            next.input.reset();
            next.input.blur();
            next.phase = Phase::Conversing;
            Ok(TransitionResult::new(next).with_effect(Effect::Converse { sentence }))
        }

        // Other keys edit the input; a blurred input ignores them
        (_, Event::Key(key)) => {
            let mut next = session.clone();
            next.input.handle_key(&key);
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Introduction outcome
        // ============================================================
        (Phase::Introducing { name }, Event::IntroduceResolved { lines }) => {
            let mut next = session.clone();
            next.user_name.clone_from(name);
            next.introduction = lines;
            next.input.focus();
            next.phase = Phase::AwaitingLine;
            Ok(TransitionResult::new(next))
        }

        (Phase::Introducing { .. }, Event::CallFailed { call: Call::Introduce, error }) => {
            Ok(TransitionResult::new(fail(session.clone(), error)))
        }

        // ============================================================
        // Conversation outcome
        // ============================================================
        (Phase::Conversing, Event::ConverseResolved { sentence }) => {
            let mut next = session.clone();
            let exchange = pending_exchange(&mut next)?;
            exchange.reply = Reply::Received(sentence);
            next.input.focus();
            next.phase = Phase::AwaitingLine;
            Ok(TransitionResult::new(next))
        }

        // The user's line stays in the transcript, marked as failed
        (Phase::Conversing, Event::CallFailed { call: Call::Converse, error }) => {
            let mut next = session.clone();
            pending_exchange(&mut next)?.reply = Reply::Failed;
            Ok(TransitionResult::new(fail(next, error)))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {phase:?} with event {event:?}"
        ))),
    }
}

// Helper functions

fn submitted_text(session: &Session) -> Result<String, TransitionError> {
    let text = session.input.value();
    if text.trim().is_empty() {
        return Err(TransitionError::EmptySubmission);
    }
    Ok(text)
}

fn pending_exchange(session: &mut Session) -> Result<&mut Exchange, TransitionError> {
    session
        .transcript
        .last_mut()
        .filter(|exchange| exchange.is_pending())
        .ok_or_else(|| {
            TransitionError::InvalidTransition("Reply arrived with no pending exchange".to_string())
        })
}

fn fail(mut session: Session, error: RpcError) -> Session {
    session.last_error = Some(error);
    session.input.blur();
    session.phase = Phase::Failed;
    session
}
