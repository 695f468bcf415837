pub mod blob;
pub mod loader;

pub use blob::{BlobRegistry, BlobStats, MediaBlob};
pub use loader::{MediaKind, MediaSlot, load_media, validate_media_url};
