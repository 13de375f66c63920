// ABOUTME: Connection monitor: authoritative connection table plus live subscribers.
// ABOUTME: Snapshot-then-delta streams over bounded queues; slow subscribers are dropped.

mod error;
mod subscription;
mod table;

pub use error::MonitorError;
pub use subscription::Subscription;
pub use table::{ConnectionMonitor, DEFAULT_QUEUE_DEPTH};
