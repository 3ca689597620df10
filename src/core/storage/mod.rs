pub mod fs;
mod path_store;

pub use path_store::{PathStore, StoragePath};
