//! Purpose: Library crate backing the `locdb` CLI and tests.
//! Exports: `api` (location client, sync helpers, errors).
//! Role: Client half of the file location directory used by archive replay.
//! Invariants: The client holds no domain state between calls.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
mod core;
