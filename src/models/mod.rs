pub mod tree_node;

pub use tree_node::TreeNode;
