pub mod file;
pub mod interface;
pub mod memory;
pub mod voice_store;

pub use file::FileStore;
pub use interface::{KeyValueStore, StoreError};
pub use memory::MemoryStore;
pub use voice_store::{VoiceId, VoiceParameterSet, VoiceStore};
