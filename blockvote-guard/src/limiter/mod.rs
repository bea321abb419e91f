pub mod clock;
pub mod identity;
pub mod policy;
pub mod sweep;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use policy::{GuardAction, LimiterSet, LimitPolicy};
pub use window::{LimitDecision, LimitParams, RateLimiter};

/// Human wait time for a throttled caller: seconds under a minute, minutes
/// under an hour, hours otherwise. Every step rounds up.
pub fn format_time_remaining(ms: u64) -> String {
    let seconds = ms.div_ceil(1000);
    if seconds < 60 {
        return format!("{seconds} seconds");
    }
    let minutes = seconds.div_ceil(60);
    if minutes < 60 {
        return format!("{minutes} minutes");
    }
    let hours = minutes.div_ceil(60);
    format!("{hours} hours")
}
