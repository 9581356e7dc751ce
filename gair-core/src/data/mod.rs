//! Raw attribute storage and the request-scoped bundle cache.

pub mod bundle;
pub mod memory;
pub mod parquet;
pub mod store;

pub use bundle::{AttributeMatrix, DataBundle};
pub use memory::InMemoryStore;
pub use parquet::ParquetStore;
pub use store::{AttributeRecord, AttributeStore, StoreError};
