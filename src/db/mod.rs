pub mod connection;
pub mod error_context;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod postgres;

pub use connection::DatabaseConnection;
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;
