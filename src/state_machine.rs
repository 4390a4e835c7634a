//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Call, Event};
pub use state::{Reply, Session};
pub use transition::transition;

#[allow(unused_imports)] // Used by tests
pub use state::{Exchange, Phase};
#[allow(unused_imports)] // Used by tests
pub use transition::{TransitionError, TransitionResult};
