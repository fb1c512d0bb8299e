//! Seam traits implemented by the satellite crates.

pub mod channel;
pub mod store;

pub use channel::DeliveryChannel;
pub use store::{ChargeStore, FailureTransition, NotificationStore};
