//! Review telemetry beyond plain `tracing` events.

pub mod prompt_dump;
