// Adapters layer: concrete implementations for external systems.

pub mod local;
pub mod memory;
pub mod repository;

pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use repository::BoardRepository;
