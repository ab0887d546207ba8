//! Triangle mesh model
//!
//! Immutable after load: vertex positions, texture coordinates, and
//! faces holding parallel position/UV index triples.

mod types;
mod obj;

pub use types::*;
pub use obj::*;
