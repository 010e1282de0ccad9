//! # Delta Protocol
//!
//! Typed real-time payloads and the broadcast publisher. Deltas are partial
//! patches carrying absolute field snapshots; delivery is best-effort.

pub mod delta;
pub mod log_stream;
pub mod publisher;

pub use delta::ScenarioDelta;
pub use log_stream::LogStreamFrame;
pub use publisher::DeltaPublisher;
