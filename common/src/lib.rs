//! Shared models and ports used by every blecount crate.
//!
//! * [`device`] and [`clock`]: plain data shared between tasks.
//! * [`transport`] and [`progress`]: the traits adapters implement.
//! * [`error`]: the error taxonomy of a run.
//! * [`config`]: presentation and run settings.

pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod macros;
pub mod progress;
pub mod transport;
