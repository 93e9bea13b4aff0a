//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `billing` - Plans, checkout, subscription records and webhook handling

pub mod billing;
pub mod foundation;
