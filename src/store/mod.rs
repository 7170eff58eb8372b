// keygate — Store Module
//
// SQLite persistence for sealed items and their audit trail. Access-control
// enforcement happens one layer up, in the keychain.

mod db;
mod error;
mod models;
mod repository;

pub use db::Database;
pub use error::StoreError;
pub use models::{ItemClass, ItemFilter, ItemRecord, ItemSummary, NewItem};
pub use repository::{ItemRepository, SqliteItemRepository};
