//! Vector index and its on-disk store

mod index;
mod store;

pub use index::{SearchResult, VectorIndex};
pub use store::IndexStore;
