pub mod catalog;
pub mod database;
pub mod error;
pub mod schema;
pub mod session;
pub mod storage;

pub use catalog::VideoCatalog;
pub use database::SqliteStorage;
pub use error::StoreError;
pub use session::{Session, SessionStore};
pub use storage::{KeyValueStorage, MemoryStorage, CATALOG_KEY, SESSION_KEY};
