use crate::domain::movie::{CleanedRecord, EnrichedRecord, SuccessStatus};
use crate::env_or;
use crate::pipeline::stats;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    /// Clean filter: `budget > min_budget`.
    pub min_budget: i64,
    /// Clean filter: `revenue > min_revenue`.
    pub min_revenue: i64,
    pub mega_hit_roi: f64,
    pub hit_roi: f64,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            min_budget: 10_000,
            min_revenue: 0,
            mega_hit_roi: 3.0,
            hit_roi: 1.0,
        }
    }
}

impl PreprocessOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_budget: env_or("CLEAN_MIN_BUDGET", defaults.min_budget),
            min_revenue: env_or("CLEAN_MIN_REVENUE", defaults.min_revenue),
            mega_hit_roi: env_or("CLASSIFY_MEGA_HIT_ROI", defaults.mega_hit_roi),
            hit_roi: env_or("CLASSIFY_HIT_ROI", defaults.hit_roi),
        }
    }
}

/// Thresholds for one run. `revenue_threshold` is the mean revenue of the cleaned set,
/// fixed before any record is classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub mega_hit_roi: f64,
    pub hit_roi: f64,
    pub revenue_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Financials {
    pub roi_ratio: f64,
    pub revenue: f64,
}

type Predicate = fn(&Financials, &Thresholds) -> bool;

/// Ordered rules; the first matching predicate decides. Anything left is break-even.
pub const CLASSIFICATION_RULES: [(Predicate, SuccessStatus); 3] = [
    (is_flop, SuccessStatus::Flop),
    (is_mega_hit, SuccessStatus::MegaHit),
    (is_hit, SuccessStatus::Hit),
];

fn is_flop(f: &Financials, _: &Thresholds) -> bool {
    f.roi_ratio < 0.0
}

// A small film with an extreme ratio but little absolute revenue stays a plain hit.
fn is_mega_hit(f: &Financials, t: &Thresholds) -> bool {
    f.roi_ratio >= t.mega_hit_roi && f.revenue >= t.revenue_threshold
}

fn is_hit(f: &Financials, t: &Thresholds) -> bool {
    f.roi_ratio >= t.hit_roi
}

pub fn classify(financials: &Financials, thresholds: &Thresholds) -> SuccessStatus {
    CLASSIFICATION_RULES
        .iter()
        .find(|(predicate, _)| predicate(financials, thresholds))
        .map(|(_, outcome)| *outcome)
        .unwrap_or(SuccessStatus::BreakEven)
}

pub fn roi_ratio(budget: i64, revenue: i64) -> f64 {
    debug_assert!(budget > 0, "roi_ratio requires a positive budget");
    (revenue - budget) as f64 / budget as f64
}

#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub records: Vec<CleanedRecord>,
    pub revenue_threshold: f64,
    pub dropped: usize,
    pub status_counts: BTreeMap<SuccessStatus, usize>,
}

pub fn preprocess(raw: Vec<EnrichedRecord>, opts: &PreprocessOptions) -> Preprocessed {
    let total = raw.len();
    // Never let a non-positive floor admit a zero budget into the ROI division.
    let min_budget = opts.min_budget.max(0);
    let kept: Vec<EnrichedRecord> = raw
        .into_iter()
        .filter(|r| r.budget > min_budget && r.revenue > opts.min_revenue)
        .collect();

    let revenues: Vec<f64> = kept.iter().map(|r| r.revenue as f64).collect();
    let revenue_threshold = stats::mean(&revenues).unwrap_or(0.0);

    let thresholds = Thresholds {
        mega_hit_roi: opts.mega_hit_roi,
        hit_roi: opts.hit_roi,
        revenue_threshold,
    };

    let mut status_counts = BTreeMap::new();
    let records: Vec<CleanedRecord> = kept
        .into_iter()
        .map(|r| {
            let roi = roi_ratio(r.budget, r.revenue);
            let status = classify(
                &Financials {
                    roi_ratio: roi,
                    revenue: r.revenue as f64,
                },
                &thresholds,
            );
            *status_counts.entry(status).or_insert(0) += 1;

            CleanedRecord {
                id: r.id,
                title: r.title,
                release_date: r.release_date,
                genres: r.genres,
                countries: r.countries,
                budget: r.budget,
                revenue: r.revenue,
                roi_ratio: roi,
                vote_average: r.vote_average,
                vote_count: r.vote_count,
                popularity: r.popularity,
                success_status: status,
            }
        })
        .collect();

    tracing::info!(
        input = total,
        kept = records.len(),
        revenue_threshold,
        "preprocess finished"
    );
    for (status, count) in &status_counts {
        tracing::info!(status = %status, count, "success status count");
    }

    Preprocessed {
        dropped: total - records.len(),
        records,
        revenue_threshold,
        status_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::movie::CollectionType;

    fn thresholds(mean: f64) -> Thresholds {
        Thresholds {
            mega_hit_roi: 3.0,
            hit_roi: 1.0,
            revenue_threshold: mean,
        }
    }

    fn raw(id: i64, budget: i64, revenue: i64) -> EnrichedRecord {
        EnrichedRecord {
            id,
            title: format!("Movie {id}"),
            release_date: "2012-01-01".to_string(),
            vote_average: 6.0,
            vote_count: 500,
            popularity: 5.0,
            collection_type: CollectionType::TopRevenue,
            budget,
            revenue,
            runtime: Some(110),
            genres: vec!["Action".to_string()],
            countries: vec!["US".to_string()],
            status: "Released".to_string(),
        }
    }

    #[test]
    fn mega_hit_needs_ratio_and_above_mean_revenue() {
        let t = thresholds(2_000_000.0);
        let roi = roi_ratio(1_000_000, 5_000_000);
        assert_eq!(roi, 4.0);
        let f = Financials {
            roi_ratio: roi,
            revenue: 5_000_000.0,
        };
        assert_eq!(classify(&f, &t), SuccessStatus::MegaHit);
    }

    #[test]
    fn high_ratio_below_mean_revenue_is_only_a_hit() {
        let t = thresholds(2_000_000.0);
        let f = Financials {
            roi_ratio: 4.0,
            revenue: 500_000.0,
        };
        assert_eq!(classify(&f, &t), SuccessStatus::Hit);
    }

    #[test]
    fn half_return_is_break_even() {
        let t = thresholds(2_000_000.0);
        let roi = roi_ratio(1_000_000, 1_500_000);
        assert_eq!(roi, 0.5);
        let f = Financials {
            roi_ratio: roi,
            revenue: 1_500_000.0,
        };
        assert_eq!(classify(&f, &t), SuccessStatus::BreakEven);
    }

    #[test]
    fn negative_ratio_is_flop_regardless_of_revenue() {
        let t = thresholds(0.0);
        let f = Financials {
            roi_ratio: -0.01,
            revenue: 1.0e12,
        };
        assert_eq!(classify(&f, &t), SuccessStatus::Flop);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let t = thresholds(100.0);
        let at = |roi: f64, revenue: f64| classify(&Financials { roi_ratio: roi, revenue }, &t);
        assert_eq!(at(0.0, 1.0), SuccessStatus::BreakEven);
        assert_eq!(at(1.0, 1.0), SuccessStatus::Hit);
        assert_eq!(at(3.0, 100.0), SuccessStatus::MegaHit);
        assert_eq!(at(3.0, 99.9), SuccessStatus::Hit);
    }

    #[test]
    fn classification_is_total_over_a_sweep() {
        let t = thresholds(1_000.0);
        for i in -20..=80 {
            let roi = i as f64 / 10.0;
            for revenue in [0.0, 999.0, 1_000.0, 5_000.0] {
                let status = classify(&Financials { roi_ratio: roi, revenue }, &t);
                let matching = CLASSIFICATION_RULES
                    .iter()
                    .filter(|(p, _)| p(&Financials { roi_ratio: roi, revenue }, &t))
                    .count();
                if matching == 0 {
                    assert_eq!(status, SuccessStatus::BreakEven);
                }
                if roi < 0.0 {
                    assert_eq!(status, SuccessStatus::Flop);
                }
            }
        }
    }

    #[test]
    fn preprocess_filters_and_derives() {
        let input = vec![
            raw(1, 1_000_000, 5_000_000),
            raw(2, 1_000_000, 1_500_000),
            raw(3, 10_000, 50_000),   // budget not above 10000
            raw(4, 2_000_000, 0),     // no revenue
            raw(5, 1_000_000, 600_000),
            raw(6, 100_000, 500_000), // roi 4.0 but tiny revenue
        ];

        let out = preprocess(input, &PreprocessOptions::default());

        let ids: Vec<i64> = out.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 5, 6]);
        assert_eq!(out.dropped, 2);
        // (5M + 1.5M + 0.6M + 0.5M) / 4
        assert_eq!(out.revenue_threshold, 1_900_000.0);

        for r in &out.records {
            assert!(r.budget > 10_000);
            assert!(r.revenue > 0);
            assert_eq!(r.roi_ratio, (r.revenue - r.budget) as f64 / r.budget as f64);
        }

        let status: Vec<SuccessStatus> = out.records.iter().map(|r| r.success_status).collect();
        assert_eq!(
            status,
            vec![
                SuccessStatus::MegaHit,
                SuccessStatus::BreakEven,
                SuccessStatus::Flop,
                SuccessStatus::Hit,
            ]
        );
        assert_eq!(out.status_counts.get(&SuccessStatus::MegaHit), Some(&1));
        assert_eq!(out.status_counts.values().sum::<usize>(), 4);
    }

    #[test]
    fn preprocess_empty_input() {
        let out = preprocess(Vec::new(), &PreprocessOptions::default());
        assert!(out.records.is_empty());
        assert_eq!(out.revenue_threshold, 0.0);
    }
}
