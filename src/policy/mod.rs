//! Key validation policy.

pub mod validation;
