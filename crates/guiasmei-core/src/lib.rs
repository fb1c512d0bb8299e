//! # GuiasMEI Core
//!
//! Shared foundation for the GuiasMEI backend: configuration tree,
//! error taxonomy, billing/notification domain types, and the traits
//! that decouple the delivery loop from Supabase and Twilio.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::GuiasMeiConfig;
pub use error::{GuiasMeiError, Result};
