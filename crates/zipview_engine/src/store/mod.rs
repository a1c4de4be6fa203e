pub mod memory;
pub mod pal_store;
pub mod tiered;
pub mod traits;

pub use memory::InMemoryByteStore;
pub use pal_store::PalByteStore;
pub use tiered::{LARGE_TIER_THRESHOLD, TieredByteStore};
pub use traits::{ArchiveMetadata, ByteStore, StoreHandle, StoredBlob};
