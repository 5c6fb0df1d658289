//! Store implementations.

mod memory;

pub use memory::{InMemoryConnectionStore, InMemoryOrderStore};
