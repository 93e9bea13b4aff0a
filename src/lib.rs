//! Subscription billing - recurring billing and subscription reconciliation.
//!
//! Mirrors plans, coupons and customers into a payment processor, drives
//! checkout through the processor's payment and setup intents, and keeps
//! local subscription records in step with the processor's webhooks.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
