// keygate — Keychain Module
//
// The secure item store: request shapes, status codes, and the store that
// enforces access-control policy before releasing record data.

mod request;
mod secure_store;
mod status;

pub use request::{AddRequest, DeleteRequest, ItemMatch, MatchLimit, ReadRequest, ReadResult};
pub use secure_store::{Keychain, SecureStore};
pub use status::KeychainError;
