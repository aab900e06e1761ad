pub mod query_log_repository;

pub use query_log_repository::SqliteQueryLogStorage;
