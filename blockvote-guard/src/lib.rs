//! Client-side guards for BlockVote poll actions: a per-caller rate limiter
//! and the sanitization/moderation pipeline run on poll text before it is
//! written on chain.

pub mod config;
pub mod error;
pub mod gate;
pub mod guard;
pub mod limiter;
pub mod metrics;
pub mod telemetry;

pub use error::GuardError;
pub use gate::{Caller, PollGate, SanitizedPoll, VoteTicket};
