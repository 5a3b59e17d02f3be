//! Safe SQL compilation: identifiers from validated descriptors only,
//! values as bound parameters.

mod builder;
pub mod params;

pub use builder::*;
pub use params::*;
