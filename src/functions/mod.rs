pub mod ops;
pub mod registry;

pub use ops::Op;
pub use registry::FunctionRegistry;
