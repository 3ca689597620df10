mod acquire;
mod index;
mod resolver;

pub use index::{LibraryIndexEntry, LibraryRecord, LibraryRegistry, LIBRARIES_DIR};
pub use resolver::{DownloadDescriptor, LibraryResolver};
