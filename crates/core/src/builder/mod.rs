//! Conversions between tensors and other representations.
//!
//! Every conversion implements [`Builder`], so the wire layer can chain
//! them without knowing their concrete types.

mod schema;
mod structural;

pub use schema::SchemaTransform;
pub use structural::StructuralTensorBuilder;

use crate::error::Result;

/// Conversion from `I` into [`Builder::Output`]
pub trait Builder<I> {
    /// Produced value
    type Output;

    /// Run the conversion
    fn build(&self, input: I) -> Result<Self::Output>;
}
