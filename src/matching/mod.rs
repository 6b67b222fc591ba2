//! Pure resolution logic: which definition, which instances.
//!
//! Nothing here talks to the engine. Both resolvers are plain functions of
//! their inputs, so the same snapshot always yields the same answer.

pub mod correlation;
pub mod definitions;

pub use correlation::{CorrelationMatch, MatchedBy};
pub use definitions::{DefinitionMatch, MatchStrategy};
