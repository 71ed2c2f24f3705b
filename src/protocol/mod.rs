//! Wire protocol between the client gate and the authorization server.

pub mod models;
