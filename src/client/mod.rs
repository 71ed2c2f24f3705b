//! Client side of the authorization protocol.

pub mod http;
pub mod keyfile;
