//! # GuiasMEI Store
//! Supabase (PostgREST) persistence for billing charges, the outbound
//! notification queue, and the webhook audit trail.

pub mod supabase;

pub use supabase::SupabaseStore;

/// Delivery attempts allowed per notification before it is parked as
/// Failed. The third failed attempt is terminal.
pub const MAX_ATTEMPTS: u32 = 3;
