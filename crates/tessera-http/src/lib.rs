//! tessera-http - Document store over a Firestore-style REST API.
//!
//! Queries go to `documents:runQuery`, writes to `documents:commit`, and
//! single documents are fetched with a plain `GET`. Field values travel in
//! the typed value encoding of that API and are converted to and from plain
//! JSON at this boundary.

mod client;
mod config;
mod store;
mod value;
mod wire;

pub use config::{DEFAULT_DATABASE, DEFAULT_MAX_BATCH_SIZE, DEFAULT_TIMEOUT, HttpStoreConfig};
pub use store::HttpStore;
pub use value::{ArrayValue, GeoPoint, MapValue, WireValue};
