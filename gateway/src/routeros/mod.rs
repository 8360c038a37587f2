//! RouterOS API transport: wire codec and TCP sessions

pub mod charset;
pub mod client;
pub mod codec;

pub use client::{RouterOsConnector, RouterOsSession};
