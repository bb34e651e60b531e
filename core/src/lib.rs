//! # blecount core
//!
//! The concurrent multi-session engine.
//!
//! * **[`orchestrator`]**: discovery → fan-out → fan-in → report.
//! * **[`session`]**: one device's connect/handshake/stream/teardown lifecycle.
//! * **[`counter`]**: the only state shared between concurrent tasks.
//! * **[`reporter`]**: the live progress line.
//! * **[`transport`]**: concrete radios implementing the common transport traits.

pub mod counter;
pub mod discovery;
pub mod orchestrator;
pub mod reporter;
pub mod session;
pub mod transport;

pub use orchestrator::{DeviceReport, Orchestrator, RunReport, Verdict};
