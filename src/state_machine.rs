//! Dialogue state machine
//!
//! Elm-style: a pure transition function from (state, event) to a new state
//! plus effects. The runtime executes the effects.

pub mod categories;
mod effect;
pub mod event;
pub mod messages;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{CategoryMode, ChatMessage, ConversationState, DialogueContext, Role, Stage};
pub use transition::{transition, Snapshot, TransitionError, TransitionResult};
