//! Store backends.

mod directory;
mod memory;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
