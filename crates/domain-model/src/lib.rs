pub mod file_tree;
pub mod options;
pub mod progress;
pub mod source_ref;
pub mod tree_snapshot;

pub use file_tree::*;
pub use options::*;
pub use progress::*;
pub use source_ref::*;
pub use tree_snapshot::*;
