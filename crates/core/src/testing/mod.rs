//! Test doubles for the collaborator traits.
//!
//! These are exported from the library (not `#[cfg(test)]`) so integration
//! tests and downstream consumers can wire an orchestrator without touching
//! the network.

pub mod fixtures;
mod mock_distiller;
mod mock_extractor;
mod mock_resolver;

pub use mock_distiller::MockDistiller;
pub use mock_extractor::MockExtractor;
pub use mock_resolver::MockResolver;
