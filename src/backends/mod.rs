//! Model backend implementations
//!
//! The core library ships no real inference backend; embedders inject one
//! through [`crate::model::ModelLoader`]. The mock backend provides a pure,
//! deterministic stand-in for tests, benchmarks and dry runs.

pub mod mock;

pub use mock::{MockModel, MockModelLoader};
