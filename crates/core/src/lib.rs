#![forbid(unsafe_code)]

pub mod model;
pub mod rollup;
pub mod streak;
pub mod time;

pub use rollup::{rollup, ProgressRollup};
pub use streak::{compute_streak, StreakSummary};
pub use time::Clock;
