//! # GuiasMEI Channels
//! Outbound delivery channel implementations.
//!
//! WhatsApp via Twilio is the only channel wired today; the
//! `DeliveryChannel` trait in guiasmei-core keeps the seam open.

pub mod whatsapp;

pub use whatsapp::TwilioWhatsApp;
