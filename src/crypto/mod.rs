//! Key material and certificate identity checks.

pub mod digest;
pub mod identity;
pub mod keygen;
