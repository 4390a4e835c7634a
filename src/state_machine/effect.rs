//! Effects produced by state transitions

/// Side effects the runtime executes after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Introduce the user; outcome arrives as `IntroduceResolved` or `CallFailed`
    Introduce { name: String },

    /// One conversational round trip; outcome arrives as `ConverseResolved` or `CallFailed`
    Converse { sentence: String },

    /// Leave the event loop
    Quit,
}
