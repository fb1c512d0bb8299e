//! # GuiasMEI Checkup
//! Readiness checks for the external integrations (Supabase, NFSe/ADN,
//! Stripe, Twilio, CI/CD), plus the Supabase Storage bucket bootstrap.
//! Advisory tooling: the report never gates the running service.

pub mod checks;
pub mod report;
pub mod storage;

pub use checks::{CheckItem, CheckOutcome, CredentialChecker, IntegrationCheck};
pub use report::{Conformity, CredentialReport};
pub use storage::{BucketOutcome, BucketSetup, StorageBootstrap};
