use crate::domain::movie::{CandidateRecord, CollectionType};
use crate::env_or;
use crate::ingest::provider::{DiscoverQuery, MovieCatalog};
use rand::Rng;
use std::collections::HashSet;

/// Which pages a strategy visits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePlan {
    /// Pages `first..=last`, in order.
    Sequential { first: u32, last: u32 },
    /// `count` distinct pages drawn uniformly from `from..=to`. Keeps the corpus from
    /// only ever seeing the most popular listings.
    Random { from: u32, to: u32, count: usize },
}

impl PagePlan {
    pub fn pages<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<u32> {
        match *self {
            PagePlan::Sequential { first, last } => (first..=last).collect(),
            PagePlan::Random { from, to, count } => {
                if to < from {
                    return Vec::new();
                }
                let span = (to - from + 1) as usize;
                rand::seq::index::sample(rng, span, count.min(span))
                    .into_iter()
                    .map(|i| from + i as u32)
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingStrategy {
    pub tag: CollectionType,
    pub sort_by: &'static str,
    pub min_votes: u32,
    pub pages: PagePlan,
}

/// The collection plan, in priority order. A movie keeps the tag of the first
/// strategy here that returned it.
pub fn default_strategies() -> Vec<SamplingStrategy> {
    vec![
        SamplingStrategy {
            tag: CollectionType::TopRevenue,
            sort_by: "revenue.desc",
            min_votes: 50,
            pages: PagePlan::Sequential { first: 1, last: 20 },
        },
        SamplingStrategy {
            tag: CollectionType::TopRated,
            sort_by: "vote_average.desc",
            min_votes: 500,
            pages: PagePlan::Sequential { first: 1, last: 10 },
        },
        SamplingStrategy {
            tag: CollectionType::LowRated,
            sort_by: "vote_average.asc",
            min_votes: 100,
            pages: PagePlan::Sequential { first: 1, last: 10 },
        },
        SamplingStrategy {
            tag: CollectionType::RandomPick,
            sort_by: "popularity.desc",
            min_votes: 50,
            pages: PagePlan::Random {
                from: 50,
                to: 500,
                count: 100,
            },
        },
    ]
}

#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub strategies: Vec<SamplingStrategy>,
    /// Stop once this many unique candidates are held.
    pub max_candidates: Option<usize>,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            max_candidates: None,
        }
    }
}

impl CollectorOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("COLLECT_MAX_CANDIDATES") {
            if let Ok(n) = s.parse::<usize>() {
                out.max_candidates = Some(n);
            }
        }

        let random_pages: usize = env_or("COLLECT_RANDOM_PAGES", 100);
        for strategy in &mut out.strategies {
            if let PagePlan::Random { count, .. } = &mut strategy.pages {
                *count = random_pages;
            }
        }

        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub pages_requested: usize,
    pub pages_failed: usize,
    pub duplicates_skipped: usize,
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub candidates: Vec<CandidateRecord>,
    pub stats: CollectionStats,
}

/// Runs every strategy in order against `catalog`, keeping the first sighting of each id.
pub async fn collect_candidates<R: Rng + ?Sized>(
    catalog: &dyn MovieCatalog,
    opts: &CollectorOptions,
    rng: &mut R,
) -> Collection {
    let mut seen = HashSet::<i64>::new();
    let mut candidates = Vec::new();
    let mut stats = CollectionStats::default();

    'strategies: for strategy in &opts.strategies {
        let before = candidates.len();

        for page in strategy.pages.pages(rng) {
            if reached(opts.max_candidates, candidates.len()) {
                break 'strategies;
            }

            let query = DiscoverQuery {
                sort_by: strategy.sort_by,
                min_votes: strategy.min_votes,
                page,
            };
            stats.pages_requested += 1;

            let items = match catalog.discover_page(&query).await {
                Ok(items) => items,
                Err(err) => {
                    stats.pages_failed += 1;
                    tracing::warn!(
                        provider = catalog.provider_name(),
                        strategy = strategy.tag.as_str(),
                        page,
                        error = %err,
                        "discover page failed; treating as empty"
                    );
                    continue;
                }
            };

            for item in items {
                if reached(opts.max_candidates, candidates.len()) {
                    break;
                }
                if !seen.insert(item.id) {
                    stats.duplicates_skipped += 1;
                    continue;
                }
                candidates.push(item.into_candidate(strategy.tag));
            }
        }

        tracing::info!(
            strategy = strategy.tag.as_str(),
            added = candidates.len() - before,
            total = candidates.len(),
            "collection strategy finished"
        );
    }

    tracing::info!(
        provider = catalog.provider_name(),
        candidates = candidates.len(),
        pages_requested = stats.pages_requested,
        pages_failed = stats.pages_failed,
        duplicates_skipped = stats.duplicates_skipped,
        "candidate collection finished"
    );

    Collection { candidates, stats }
}

fn reached(max: Option<usize>, len: usize) -> bool {
    max.is_some_and(|m| len >= m)
}
