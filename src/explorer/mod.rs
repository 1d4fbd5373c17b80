//! Explorer core: accumulation loop, path tree, and hidden-key derivation.

pub mod accumulator;
pub mod hidden_key;
pub mod tree;

pub use accumulator::{FileAccumulator, FileCollection};
pub use hidden_key::derive_hidden_key;
pub use tree::{build_tree, TreeState};
