//! Canonicalization engine
//!
//! Leaves first: [`normalizer`], [`alias`], [`similarity`], [`registry`],
//! then the [`resolver`] that chains them and the [`batch`] clustering pass.

pub mod alias;
pub mod batch;
pub mod normalizer;
pub mod registry;
pub mod resolver;
pub mod similarity;

pub use alias::{resolve_alias, AliasTable};
pub use batch::{BatchCanonicalizer, BatchOutput, BatchWarning, RepresentativePolicy, SourceTable};
pub use normalizer::normalize;
pub use registry::{CanonicalPool, PoolEntry, VenueStore};
pub use resolver::{MatchDecision, MatchStage, Resolver, ResolverConfig};
pub use similarity::{best_match, rating, BestMatch, MatchThreshold};

use thiserror::Error;

/// Resolution failures (a missing match is not one of them)
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Required input missing or blank; matching was not attempted
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Registry, alias or queue collaborator failed
    #[error(transparent)]
    Collaborator(#[from] venue_common::Error),
}
