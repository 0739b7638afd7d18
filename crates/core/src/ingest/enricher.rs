use crate::domain::movie::{CandidateRecord, EnrichedRecord};
use crate::env_or;
use crate::ingest::provider::MovieCatalog;

const MAX_LOGGED_FAILURES: usize = 10;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Admission floor; a record needs `budget > min_budget`.
    pub min_budget: i64,
    pub progress_every: usize,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            min_budget: 1000,
            progress_every: 50,
        }
    }
}

impl EnrichOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_budget: env_or("ENRICH_MIN_BUDGET", defaults.min_budget),
            progress_every: env_or("ENRICH_PROGRESS_EVERY", defaults.progress_every),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub attempted: usize,
    pub admitted: usize,
    pub below_floor: usize,
    pub failed: usize,
    pub records: Vec<EnrichedRecord>,
}

/// Fetches detail for every candidate and keeps the ones that clear the budget floor.
///
/// A failed detail call drops only that candidate.
pub async fn enrich_candidates(
    catalog: &dyn MovieCatalog,
    candidates: Vec<CandidateRecord>,
    opts: &EnrichOptions,
) -> EnrichmentReport {
    let total = candidates.len();
    let mut report = EnrichmentReport::default();

    for (idx, candidate) in candidates.into_iter().enumerate() {
        if opts.progress_every != 0 && idx % opts.progress_every == 0 {
            tracing::info!(
                processed = idx,
                total,
                admitted = report.admitted,
                failures = report.failed,
                "detail enrichment progress"
            );
        }

        report.attempted += 1;
        match catalog.movie_detail(candidate.id).await {
            Ok(detail) => {
                if detail.budget > opts.min_budget {
                    report.records.push(EnrichedRecord::merge(candidate, detail));
                    report.admitted += 1;
                } else {
                    report.below_floor += 1;
                }
            }
            Err(err) => {
                report.failed += 1;
                if report.failed <= MAX_LOGGED_FAILURES {
                    tracing::warn!(
                        idx,
                        id = candidate.id,
                        title = %candidate.title,
                        failure_count = report.failed,
                        error = %err,
                        "detail fetch failed; dropping candidate"
                    );
                }
            }
        }
    }

    tracing::info!(
        provider = catalog.provider_name(),
        attempted = report.attempted,
        admitted = report.admitted,
        below_floor = report.below_floor,
        failures = report.failed,
        "detail enrichment finished"
    );

    report
}
