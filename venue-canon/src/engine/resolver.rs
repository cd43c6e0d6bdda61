//! Resolution Orchestrator
//!
//! Decides which canonical venue a raw name refers to, in strict order:
//!
//! 1. Normalize the raw name
//! 2. Alias lookup (a hit skips everything else)
//! 3. Best fuzzy match against the canonical pool; accepted when the rating is
//!    strictly above the threshold
//! 4. Otherwise queue the normalized name as unmatched
//!
//! Only step 4 (and the optional learned-alias write) touches the store for
//! writing. A failed lookup is returned as an error, never as "unmatched".

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use venue_common::config::{MatchingConfig, SelfMatchPolicy};
use venue_common::db::{AliasSource, UnmatchedVenue, VenueId};

use crate::engine::alias::resolve_alias;
use crate::engine::normalizer::normalize;
use crate::engine::registry::{CanonicalPool, VenueStore};
use crate::engine::similarity::{best_match, MatchThreshold};
use crate::engine::ResolveError;

/// Stage that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStage {
    Alias,
    Fuzzy,
    Unmatched,
}

/// Outcome of resolving one raw name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchDecision {
    pub canonical_id: Option<VenueId>,
    pub stage: MatchStage,
    /// 1.0 for alias hits, the best rating otherwise (0.0 with an empty pool)
    pub score: f64,
    pub normalized_name: String,
    /// Normalized canonical name the fuzzy stage matched or came closest to
    pub matched_name: Option<String>,
}

impl MatchDecision {
    pub fn is_matched(&self) -> bool {
        self.canonical_id.is_some()
    }
}

/// Resolver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    pub threshold: MatchThreshold,
    pub self_match: SelfMatchPolicy,
    pub learn_fuzzy_aliases: bool,
}

impl ResolverConfig {
    pub fn new(threshold: MatchThreshold) -> Self {
        Self {
            threshold,
            self_match: SelfMatchPolicy::Accept,
            learn_fuzzy_aliases: false,
        }
    }

    pub fn from_matching(matching: &MatchingConfig) -> venue_common::Result<Self> {
        Ok(Self {
            threshold: MatchThreshold::new(matching.threshold)?,
            self_match: matching.self_match,
            learn_fuzzy_aliases: matching.learn_fuzzy_aliases,
        })
    }
}

/// Resolution Orchestrator bound to a store handle
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn VenueStore>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(store: Arc<dyn VenueStore>, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve one raw name reported by `provider`
    ///
    /// # Errors
    /// - [`ResolveError::MalformedRequest`] if the provider is empty or the
    ///   name is blank after normalization
    /// - [`ResolveError::Collaborator`] if an alias or registry lookup fails
    ///
    /// A failed unmatched-queue write is logged and does not fail the call.
    pub async fn resolve(&self, raw_name: &str, provider: &str) -> Result<MatchDecision, ResolveError> {
        if provider.trim().is_empty() {
            return Err(ResolveError::MalformedRequest("provider is required".to_string()));
        }

        let normalized = normalize(raw_name);
        if normalized.is_empty() {
            return Err(ResolveError::MalformedRequest(
                "raw_name is blank after normalization".to_string(),
            ));
        }

        if let Some(id) = resolve_alias(&normalized, self.store.as_ref()).await? {
            debug!(raw_name = %raw_name, normalized = %normalized, canonical_id = id, "Alias hit");
            return Ok(MatchDecision {
                canonical_id: Some(id),
                stage: MatchStage::Alias,
                score: 1.0,
                normalized_name: normalized,
                matched_name: None,
            });
        }

        let pool = CanonicalPool::load(self.store.as_ref()).await?;
        let best = best_match(&normalized, pool.names(), self.config.self_match);

        if let Some(best) = best {
            let entry = pool.get(best.index).ok_or_else(|| {
                venue_common::Error::Internal(format!("pool index {} out of range", best.index))
            })?;

            if self.config.threshold.accepts(best.rating) {
                debug!(
                    raw_name = %raw_name,
                    normalized = %normalized,
                    target = %entry.normalized_name,
                    rating = best.rating,
                    canonical_id = entry.id,
                    "Fuzzy match"
                );

                if self.config.learn_fuzzy_aliases {
                    self.learn_alias(&normalized, entry.id).await;
                }

                return Ok(MatchDecision {
                    canonical_id: Some(entry.id),
                    stage: MatchStage::Fuzzy,
                    score: best.rating,
                    normalized_name: normalized,
                    matched_name: Some(entry.normalized_name.clone()),
                });
            }

            return Ok(self
                .unmatched(normalized, provider, best.rating, Some(entry.normalized_name.clone()))
                .await);
        }

        Ok(self.unmatched(normalized, provider, 0.0, None).await)
    }

    /// Queue the name (best-effort) and build the unmatched decision
    async fn unmatched(
        &self,
        normalized: String,
        provider: &str,
        score: f64,
        closest: Option<String>,
    ) -> MatchDecision {
        let entry = UnmatchedVenue::new(normalized.clone(), provider);
        match self.store.enqueue_unmatched(&entry).await {
            Ok(()) => info!(
                raw_name = %normalized,
                provider = %provider,
                best_rating = score,
                "Queued unmatched venue"
            ),
            Err(e) => warn!(
                raw_name = %normalized,
                provider = %provider,
                error = %e,
                "Failed to queue unmatched venue"
            ),
        }

        MatchDecision {
            canonical_id: None,
            stage: MatchStage::Unmatched,
            score,
            normalized_name: normalized,
            matched_name: closest,
        }
    }

    async fn learn_alias(&self, normalized: &str, canonical_id: VenueId) {
        match self
            .store
            .upsert_alias_mapping(normalized, canonical_id, AliasSource::Learned)
            .await
        {
            Ok(outcome) => debug!(key = %normalized, canonical_id, ?outcome, "Learned alias"),
            Err(e) => warn!(key = %normalized, error = %e, "Failed to record learned alias"),
        }
    }
}
