pub mod tree;

pub use tree::{GpNode, GpTree};
