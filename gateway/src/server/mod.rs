//! HTTP surface over the gateway facade

pub mod extract;
pub mod handlers;
pub mod serve;
pub mod state;
