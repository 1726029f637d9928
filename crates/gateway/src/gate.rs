use crate::breaker::RateLimitBreaker;
use crate::denylist::{Denylist, normalize};
use crate::metrics;
use crate::moderation::{ModerationClient, ModerationOutcome, UnavailableCause};
use crate::verdict_cache::{Verdict, VerdictCache};

/// Category attached to denylist blocks; the local list only covers sexual
/// content, so no finer taxonomy applies.
pub const DENYLIST_CATEGORY: &str = "sexual";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Block { categories: Vec<String> },
    Unavailable { cause: UnavailableCause },
}

/// Policy applied when moderation cannot be performed at all. The product
/// default is fail-closed: no verdict means no search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailablePolicy {
    Allow,
    Block,
}

/// Layered allow/block decision for one query.
///
/// Stages run in a fixed order and short-circuit on the first definitive
/// answer: denylist, verdict cache, rate-limit breaker, then the external
/// moderation call. Side effects are confined to cache writes and the
/// breaker; all shared state is owned here and injected at construction so
/// each router instance gets its own.
#[derive(Clone)]
pub struct ModerationGate {
    denylist: Denylist,
    cache: VerdictCache,
    breaker: RateLimitBreaker,
    client: ModerationClient,
    on_unavailable: UnavailablePolicy,
}

impl ModerationGate {
    pub fn new(
        cache: VerdictCache,
        breaker: RateLimitBreaker,
        client: ModerationClient,
        on_unavailable: UnavailablePolicy,
    ) -> Self {
        Self {
            denylist: Denylist::new(),
            cache,
            breaker,
            client,
            on_unavailable,
        }
    }

    pub async fn evaluate(&self, query: &str) -> GateDecision {
        let normalized = normalize(query);

        if self.denylist.matches(&normalized) {
            let categories = vec![DENYLIST_CATEGORY.to_string()];
            self.cache
                .put(normalized, Verdict::Block, categories.clone())
                .await;
            metrics::observe_gate_decision("denylist", "block");
            return GateDecision::Block { categories };
        }

        if let Some((verdict, categories)) = self.cache.get(&normalized).await {
            return match verdict {
                Verdict::Allow => {
                    metrics::observe_gate_decision("cache", "allow");
                    GateDecision::Allow
                }
                Verdict::Block => {
                    metrics::observe_gate_decision("cache", "block");
                    GateDecision::Block { categories }
                }
            };
        }

        if self.breaker.is_open() {
            // Degraded mode: no provider call during the cooldown, the
            // denylist and the search provider's own filter are the only
            // protection.
            metrics::observe_gate_decision("breaker", "allow");
            return GateDecision::Allow;
        }

        match self.client.classify(query).await {
            ModerationOutcome::Allowed => {
                self.cache.put(normalized, Verdict::Allow, Vec::new()).await;
                metrics::observe_gate_decision("provider", "allow");
                GateDecision::Allow
            }
            ModerationOutcome::Flagged { categories } => {
                self.cache
                    .put(normalized, Verdict::Block, categories.clone())
                    .await;
                metrics::observe_gate_decision("provider", "block");
                GateDecision::Block { categories }
            }
            ModerationOutcome::RateLimited => {
                // Transient: nothing is cached, this request proceeds under
                // denylist-only cover until the cooldown elapses.
                self.breaker.trip();
                metrics::inc_breaker_trip();
                metrics::observe_gate_decision("provider", "rate_limited");
                tracing::warn!(query = %normalized, "moderation rate limited; breaker tripped");
                GateDecision::Allow
            }
            ModerationOutcome::Unavailable { cause } => {
                metrics::observe_gate_decision("provider", "unavailable");
                tracing::warn!(%cause, "moderation unavailable");
                match self.on_unavailable {
                    UnavailablePolicy::Block => GateDecision::Unavailable { cause },
                    UnavailablePolicy::Allow => GateDecision::Allow,
                }
            }
        }
    }
}
