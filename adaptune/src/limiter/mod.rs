//! Rate limiters whose timing adapts to runtime signals.
//!
//! - [`DynamicThrottler`] widens its interval while performance degrades and
//!   narrows it again once performance recovers.
//! - [`DynamicDebouncer`] shortens its delay during intense interaction and
//!   lengthens it when the user is idle.
//!
//! Neither owns a timer. The host passes the current instant on every call
//! (usually from a [`Clock`](crate::clock::Clock)), which keeps both fully
//! deterministic under test.

mod debounce;
mod throttle;

pub use debounce::{DebounceConfig, DynamicDebouncer};
pub use throttle::{DynamicThrottler, ThrottleConfig, METRIC_WINDOW};
