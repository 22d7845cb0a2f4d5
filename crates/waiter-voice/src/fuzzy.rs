//! Resolve a spoken dish name against the catalog snapshot.
//!
//! Stages, first hit wins:
//! 1. exact match of normalized names
//! 2. containment (dish name contains the query or the query contains the dish name)
//! 3. token overlap: Jaccard similarity of stemmed token sets, against the name
//!    alone and against name + description + tags; the best dish must reach the threshold
//!
//! Ties resolve to the earliest dish in catalog order.

use crate::catalog::DishRecord;
use crate::config::DEFAULT_MATCH_THRESHOLD;
use crate::text::{normalize, stem, tokens};
use std::collections::HashSet;

/// How a dish was matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Exact,
    Containment,
    TokenOverlap(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DishMatch<'a> {
    pub dish: &'a DishRecord,
    pub kind: MatchKind,
}

/// Name resolver with a configurable acceptance threshold.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best dish for `query`, or `None` when nothing is close enough.
    pub fn resolve<'a>(&self, catalog: &'a [DishRecord], query: &str) -> Option<&'a DishRecord> {
        self.best_match(catalog, query).map(|m| m.dish)
    }

    /// Like [`FuzzyMatcher::resolve`] but also reports which stage matched.
    pub fn best_match<'a>(&self, catalog: &'a [DishRecord], query: &str) -> Option<DishMatch<'a>> {
        let q = normalize(query);
        if q.is_empty() {
            return None;
        }

        let names: Vec<String> = catalog.iter().map(|d| normalize(&d.name)).collect();

        if let Some(i) = names.iter().position(|n| *n == q) {
            return Some(DishMatch {
                dish: &catalog[i],
                kind: MatchKind::Exact,
            });
        }

        if let Some(i) = names
            .iter()
            .position(|n| !n.is_empty() && (n.contains(&q) || q.contains(n.as_str())))
        {
            return Some(DishMatch {
                dish: &catalog[i],
                kind: MatchKind::Containment,
            });
        }

        let query_tokens = stemmed_tokens(&q);
        let mut best: Option<(usize, f64)> = None;
        for (i, dish) in catalog.iter().enumerate() {
            let score = jaccard(&query_tokens, &stemmed_tokens(&dish.name))
                .max(jaccard(&query_tokens, &stemmed_tokens(&dish.haystack())));
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((i, score));
            }
        }

        match best {
            Some((i, score)) if score >= self.threshold => Some(DishMatch {
                dish: &catalog[i],
                kind: MatchKind::TokenOverlap(score),
            }),
            _ => None,
        }
    }
}

/// Resolve with the default threshold (0.34).
pub fn resolve<'a>(catalog: &'a [DishRecord], query: &str) -> Option<&'a DishRecord> {
    FuzzyMatcher::default().resolve(catalog, query)
}

fn stemmed_tokens(s: &str) -> HashSet<String> {
    tokens(s).iter().map(|t| stem(t)).collect()
}

/// |A ∩ B| / |A ∪ B|, zero for two empty sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}
