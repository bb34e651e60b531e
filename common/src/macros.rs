//! Logging shorthands shared by the workspace.
//!
//! They forward to `tracing` so the CLI formatter decides how each level looks.
//! `success!` is an info event on a dedicated target.

pub const SUCCESS_TARGET: &str = "blecount::success";

#[doc(hidden)]
pub use tracing as __tracing;

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::macros::__tracing::info!(target: "blecount::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::macros::__tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::macros::__tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::macros::__tracing::error!($($arg)*)
    };
}
