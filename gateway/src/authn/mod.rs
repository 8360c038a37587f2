//! Operator authentication

pub mod credentials;
pub mod token;
pub mod users;

pub use credentials::{CredentialService, Grant, LocalCredentials, Principal};
