// keygate — Library root
//
// Presence-gated credential storage: access-control policies, the
// authentication broker, the enclave, the item store, and the thin client.

pub mod access;
pub mod broker;
pub mod cli;
pub mod client;
pub mod config;
pub mod enclave;
pub mod error;
pub mod keychain;
pub mod store;

pub use client::{CredentialClient, Credentials};
pub use error::{KeygateError, Result};
pub use keychain::KeychainError;
