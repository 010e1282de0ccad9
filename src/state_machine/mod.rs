//! # Scenario State Machine
//!
//! Status vocabulary, transition events, and validated transitions for the
//! scenario lifecycle. Transitions are a pure table ([`next_status`]); the
//! [`ScenarioStateMachine`] wrapper adds the retry/failed-phase guard,
//! timestamp stamping, and delta publication.

pub mod errors;
pub mod events;
pub mod machine;
pub mod states;

pub use errors::{TransitionError, TransitionResult};
pub use events::ScenarioEvent;
pub use machine::{next_status, ScenarioStateMachine};
pub use states::ScenarioStatus;
