pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use manager::{ConnectError, DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::NorthwindStore;
