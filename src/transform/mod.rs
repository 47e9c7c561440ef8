//! Output transformers.
//!
//! A [`Transformer`] renders a fully materialized [`ResultSet`] into bytes.
//! The materializer never sees transformers; callers pick one per invocation.

mod json;

pub use json::{JsonLinesTransformer, JsonTransformer};

use crate::db::ResultSet;
use crate::error::Result;

/// Renders a result set into an output format.
///
/// Implementations receive the complete result set, never a partial view,
/// and return [`crate::SrtError::Transform`] when a value cannot be
/// represented in their format.
pub trait Transformer: Send + Sync {
    /// Serializes `result` into the transformer's output format.
    fn transform(&self, result: &ResultSet) -> Result<Vec<u8>>;
}

impl<T: Transformer + ?Sized> Transformer for &T {
    fn transform(&self, result: &ResultSet) -> Result<Vec<u8>> {
        (**self).transform(result)
    }
}

impl<T: Transformer + ?Sized> Transformer for Box<T> {
    fn transform(&self, result: &ResultSet) -> Result<Vec<u8>> {
        (**self).transform(result)
    }
}
