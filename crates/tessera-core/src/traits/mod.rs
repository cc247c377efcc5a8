//! Backend traits.

mod store;

pub use store::DocumentStore;
