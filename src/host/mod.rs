//! Host-facing command/event contract for presentation-layer integration.

pub mod channel;
pub mod contract;
pub mod sink;
pub mod stdio;
