mod api;
mod codec;
mod error;
mod maintenance;
mod redb_store;
mod row_key;

pub use api::*;
pub use error::*;
pub use redb_store::RedbStore;
pub use row_key::RowKey;
