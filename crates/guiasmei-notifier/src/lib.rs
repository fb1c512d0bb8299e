//! # GuiasMEI Notifier
//! Background worker that drains the pending notification queue and
//! dispatches WhatsApp messages with bounded retry.
//!
//! Run exactly one worker per queue: the failure path reads and rewrites
//! the attempts counter without locking, so concurrent instances would
//! race each other into double sends and lost counts.

pub mod processor;
pub mod templates;

pub use processor::{CycleStats, NotificationProcessor};
