mod bounds_tree;

pub use bounds_tree::BoundsTree;
