//! Terminal widgets driven by the session
//!
//! Both widgets are plain values: they consume input events and produce a
//! renderable string, so the session stays `Clone` and rendering stays pure.

mod spinner;
mod text_input;

pub use spinner::Spinner;
pub use text_input::TextInput;
