//! Standard period metrics.
//!
//! Flow metrics count roster events per period; rate metrics relate those
//! events to the average head count of the period.

pub mod hires;
pub mod retention;
pub mod terminations;
pub mod turnover;

pub use hires::Hires;
pub use retention::RetentionRate;
pub use terminations::Terminations;
pub use turnover::TurnoverRate;
