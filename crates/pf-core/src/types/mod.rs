//! Core data types: canonical currency pairs, cached observations, and the
//! price values handed to consumers.

pub mod market;
pub mod pair;

pub use market::*;
pub use pair::*;
