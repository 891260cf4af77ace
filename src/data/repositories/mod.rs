pub mod sqlite_store;
pub mod user;

pub use sqlite_store::SqliteStore;
pub use user::UserRepository;
