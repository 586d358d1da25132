pub mod database;
pub mod ledger_store;
pub mod user_repository;

pub use database::Database;
pub use ledger_store::SqliteLedgerStore;
pub use user_repository::SqliteUserRepository;
