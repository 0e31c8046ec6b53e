mod memory;
mod sqlite;

pub use memory::MemoryTaskStore;
pub use sqlite::{SqliteTaskStore, SCHEMA_VERSION};
