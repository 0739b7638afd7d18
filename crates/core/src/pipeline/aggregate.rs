//! Group-wise statistics over the cleaned dataset.
//!
//! Multi-valued categories are exploded into one row per value first; every group
//! statistic then runs over those rows and skips groups below a support threshold.

use crate::domain::movie::{CleanedRecord, SuccessStatus};
use crate::env_or;
use crate::pipeline::stats::{self, LinearFit};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryField {
    Genre,
    Country,
}

impl CategoryField {
    fn values(self, record: &CleanedRecord) -> &[String] {
        match self {
            Self::Genre => &record.genres,
            Self::Country => &record.countries,
        }
    }
}

/// One `(record, single category value)` pair. `index` is the record's position in
/// the source slice; `value` is `None` for a record with no values at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplodedRow<'a> {
    pub index: usize,
    pub record: &'a CleanedRecord,
    pub value: Option<&'a str>,
}

pub fn explode(records: &[CleanedRecord], field: CategoryField) -> Vec<ExplodedRow<'_>> {
    let mut out = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let values = field.values(record);
        if values.is_empty() {
            out.push(ExplodedRow {
                index,
                record,
                value: None,
            });
            continue;
        }
        for v in values {
            out.push(ExplodedRow {
                index,
                record,
                value: Some(v.as_str()),
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    VoteAverage,
    Popularity,
    Budget,
    Revenue,
    RoiRatio,
    RoiPercent,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::VoteAverage,
        Metric::Popularity,
        Metric::Budget,
        Metric::Revenue,
        Metric::RoiRatio,
        Metric::RoiPercent,
    ];

    pub fn value(self, r: &CleanedRecord) -> f64 {
        match self {
            Self::VoteAverage => r.vote_average,
            Self::Popularity => r.popularity,
            Self::Budget => r.budget as f64,
            Self::Revenue => r.revenue as f64,
            Self::RoiRatio => r.roi_ratio,
            Self::RoiPercent => r.roi_ratio * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub group: String,
    pub count: usize,
    pub mean: f64,
}

/// Rows per category value, keeping only values with at least `min_support` rows.
fn supported_groups<'r, 'a>(
    rows: &'r [ExplodedRow<'a>],
    min_support: usize,
) -> BTreeMap<&'a str, Vec<&'r ExplodedRow<'a>>> {
    let mut groups: BTreeMap<&'a str, Vec<&'r ExplodedRow<'a>>> = BTreeMap::new();
    for row in rows {
        if let Some(v) = row.value {
            groups.entry(v).or_default().push(row);
        }
    }
    groups.retain(|_, members| members.len() >= min_support);
    groups
}

fn sorted_by_mean_desc(mut stats: Vec<GroupStat>) -> Vec<GroupStat> {
    stats.sort_by(|a, b| b.mean.total_cmp(&a.mean).then_with(|| a.group.cmp(&b.group)));
    stats
}

fn group_means_by<F>(rows: &[ExplodedRow<'_>], min_support: usize, value: F) -> Vec<GroupStat>
where
    F: Fn(&ExplodedRow<'_>) -> f64,
{
    let groups = supported_groups(rows, min_support)
        .into_iter()
        .filter_map(|(group, members)| {
            let values: Vec<f64> = members.iter().map(|row| value(*row)).collect();
            Some(GroupStat {
                group: group.to_string(),
                count: members.len(),
                mean: stats::mean(&values)?,
            })
        })
        .collect();
    sorted_by_mean_desc(groups)
}

/// Mean of `metric` per category value, highest first.
pub fn group_means(rows: &[ExplodedRow<'_>], metric: Metric, min_support: usize) -> Vec<GroupStat> {
    group_means_by(rows, min_support, |row| metric.value(row.record))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualReport {
    pub quality_metric: Metric,
    pub fit: LinearFit,
    /// Mean of `roi_ratio - predicted_roi` per group. Positive means the group earns
    /// more than its quality score alone predicts.
    pub groups: Vec<GroupStat>,
}

/// Fits `roi_ratio` on `quality` once over all records, then averages each record's
/// residual per category value.
pub fn residuals_by_group(
    records: &[CleanedRecord],
    field: CategoryField,
    quality: Metric,
    min_support: usize,
) -> Option<ResidualReport> {
    let xs: Vec<f64> = records.iter().map(|r| quality.value(r)).collect();
    let ys: Vec<f64> = records.iter().map(|r| r.roi_ratio).collect();
    let fit = stats::fit_ols(&xs, &ys)?;

    let residuals: Vec<f64> = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| y - fit.predict(*x))
        .collect();

    let rows = explode(records, field);
    let groups = group_means_by(&rows, min_support, |row| residuals[row.index]);

    Some(ResidualReport {
        quality_metric: quality,
        fit,
        groups,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub count: usize,
    pub vote_mean: f64,
    pub vote_median: f64,
    pub roi_percent_mean: f64,
    pub roi_percent_median: f64,
    pub budget_mean: f64,
    pub popularity_mean: f64,
}

/// Per-value distribution summary, ordered by row count (largest first).
pub fn group_summaries(rows: &[ExplodedRow<'_>], min_support: usize) -> Vec<GroupSummary> {
    let mut out: Vec<GroupSummary> = supported_groups(rows, min_support)
        .into_iter()
        .filter_map(|(group, members)| {
            let collect = |m: Metric| -> Vec<f64> {
                members.iter().map(|row| m.value(row.record)).collect()
            };
            let votes = collect(Metric::VoteAverage);
            let roi = collect(Metric::RoiPercent);
            Some(GroupSummary {
                group: group.to_string(),
                count: members.len(),
                vote_mean: stats::mean(&votes)?,
                vote_median: stats::median(&votes)?,
                roi_percent_mean: stats::mean(&roi)?,
                roi_percent_median: stats::median(&roi)?,
                budget_mean: stats::mean(&collect(Metric::Budget))?,
                popularity_mean: stats::mean(&collect(Metric::Popularity))?,
            })
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.group.cmp(&b.group)));
    out
}

/// OLS of `log10(revenue)` on `log10(budget)` over records where both exceed
/// `min_money`. `r_value` is the Pearson correlation of the two logs.
pub fn budget_revenue_log_fit(records: &[CleanedRecord], min_money: i64) -> Option<LinearFit> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = records
        .iter()
        .filter(|r| r.budget > min_money && r.revenue > min_money)
        .map(|r| ((r.budget as f64).log10(), (r.revenue as f64).log10()))
        .unzip();
    stats::fit_ols(&xs, &ys)
}

/// Where a genre sits relative to the other major genres. The z-scores use the mean
/// and sample std across genres, not across movies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenrePosition {
    pub group: String,
    pub count: usize,
    pub roi_ratio_mean: f64,
    pub vote_mean: f64,
    pub roi_z: f64,
    pub vote_z: f64,
}

/// Empty when fewer than two groups qualify or either mean is flat across groups.
pub fn genre_positions(rows: &[ExplodedRow<'_>], min_support: usize) -> Vec<GenrePosition> {
    let groups: Vec<(&str, usize, f64, f64)> = supported_groups(rows, min_support)
        .into_iter()
        .filter_map(|(group, members)| {
            let roi: Vec<f64> = members.iter().map(|row| row.record.roi_ratio).collect();
            let votes: Vec<f64> = members.iter().map(|row| row.record.vote_average).collect();
            Some((group, members.len(), stats::mean(&roi)?, stats::mean(&votes)?))
        })
        .collect();

    let roi_means: Vec<f64> = groups.iter().map(|g| g.2).collect();
    let vote_means: Vec<f64> = groups.iter().map(|g| g.3).collect();
    let (Some(roi_z), Some(vote_z)) = (stats::z_scores(&roi_means), stats::z_scores(&vote_means)) else {
        return Vec::new();
    };

    groups
        .into_iter()
        .zip(roi_z.into_iter().zip(vote_z))
        .map(|((group, count, roi_ratio_mean, vote_mean), (roi_z, vote_z))| GenrePosition {
            group: group.to_string(),
            count,
            roi_ratio_mean,
            vote_mean,
            roi_z,
            vote_z,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// The `n` most frequent category values.
pub fn top_values(rows: &[ExplodedRow<'_>], n: usize) -> Vec<ValueCount> {
    let mut out: Vec<ValueCount> = supported_groups(rows, 1)
        .into_iter()
        .map(|(value, members)| ValueCount {
            value: value.to_string(),
            count: members.len(),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    out.truncate(n);
    out
}

pub fn status_counts(records: &[CleanedRecord]) -> BTreeMap<SuccessStatus, usize> {
    let mut out = BTreeMap::new();
    for r in records {
        *out.entry(r.success_status).or_insert(0) += 1;
    }
    out
}

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Support threshold for the per-genre summaries.
    pub min_support: usize,
    /// Support threshold for genre means and residuals ("major" genres).
    pub major_min_support: usize,
    pub top_countries: usize,
    pub quality_metric: Metric,
    /// Budget and revenue must both exceed this for the log-scale correlation.
    pub log_min_money: i64,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            min_support: 30,
            major_min_support: 50,
            top_countries: 15,
            quality_metric: Metric::VoteAverage,
            log_min_money: 10_000,
        }
    }
}

impl AggregateOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_support: env_or("AGGREGATE_MIN_SUPPORT", defaults.min_support),
            major_min_support: env_or("AGGREGATE_MAJOR_MIN_SUPPORT", defaults.major_min_support),
            top_countries: env_or("AGGREGATE_TOP_COUNTRIES", defaults.top_countries),
            quality_metric: defaults.quality_metric,
            log_min_money: env_or("AGGREGATE_LOG_MIN_MONEY", defaults.log_min_money),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub record_count: usize,
    pub status_counts: BTreeMap<SuccessStatus, usize>,
    pub genre_means: BTreeMap<Metric, Vec<GroupStat>>,
    pub genre_residuals: Option<ResidualReport>,
    pub budget_revenue_log_fit: Option<LinearFit>,
    pub genre_positions: Vec<GenrePosition>,
    pub genre_summaries: Vec<GroupSummary>,
    pub top_countries: Vec<ValueCount>,
}

pub fn build_report(records: &[CleanedRecord], opts: &AggregateOptions) -> AggregateReport {
    let genre_rows = explode(records, CategoryField::Genre);
    let country_rows = explode(records, CategoryField::Country);

    let genre_means = Metric::ALL
        .iter()
        .map(|m| (*m, group_means(&genre_rows, *m, opts.major_min_support)))
        .collect();

    let genre_residuals = residuals_by_group(
        records,
        CategoryField::Genre,
        opts.quality_metric,
        opts.major_min_support,
    );
    if genre_residuals.is_none() {
        tracing::warn!(records = records.len(), "not enough variance for a regression fit; skipping residuals");
    }

    let budget_revenue_log_fit = budget_revenue_log_fit(records, opts.log_min_money);
    if let Some(fit) = &budget_revenue_log_fit {
        tracing::info!(n = fit.n, r_value = fit.r_value, "log budget/revenue correlation");
    }

    let report = AggregateReport {
        record_count: records.len(),
        status_counts: status_counts(records),
        genre_means,
        genre_residuals,
        budget_revenue_log_fit,
        genre_positions: genre_positions(&genre_rows, opts.major_min_support),
        genre_summaries: group_summaries(&genre_rows, opts.min_support),
        top_countries: top_values(&country_rows, opts.top_countries),
    };

    tracing::info!(
        records = report.record_count,
        genre_rows = genre_rows.len(),
        summarized_genres = report.genre_summaries.len(),
        "aggregate report built"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, genres: &[&str], vote: f64, roi: f64) -> CleanedRecord {
        let budget = 1_000_000;
        CleanedRecord {
            id,
            title: format!("Movie {id}"),
            release_date: "2019-01-01".to_string(),
            genres: genres.iter().map(|s| s.to_string()).collect(),
            countries: vec!["US".to_string()],
            budget,
            revenue: budget + (roi * budget as f64) as i64,
            roi_ratio: roi,
            vote_average: vote,
            vote_count: 100,
            popularity: 10.0,
            success_status: SuccessStatus::Hit,
        }
    }

    #[test]
    fn explode_duplicates_parent_per_genre() {
        let records = vec![rec(1, &["Action", "Comedy", "Drama"], 7.0, 1.0)];
        let rows = explode(&records, CategoryField::Genre);
        assert_eq!(rows.len(), 3);
        let values: Vec<Option<&str>> = rows.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Some("Action"), Some("Comedy"), Some("Drama")]);
        assert!(rows.iter().all(|r| r.record.id == 1 && r.record.budget == 1_000_000));
    }

    #[test]
    fn explode_keeps_record_without_genres() {
        let records = vec![rec(1, &[], 7.0, 1.0), rec(2, &["Horror"], 5.0, 2.0)];
        let rows = explode(&records, CategoryField::Genre);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, None);
        assert_eq!(rows[0].record.id, 1);
        assert_eq!(rows[1].index, 1);
    }

    #[test]
    fn min_support_boundary() {
        let mut records = Vec::new();
        for i in 0..29 {
            records.push(rec(i, &["Western"], 6.0, 1.0));
        }
        for i in 100..130 {
            records.push(rec(i, &["Comedy"], 6.0, 2.0));
        }
        let rows = explode(&records, CategoryField::Genre);
        let stats = group_means(&rows, Metric::RoiRatio, 30);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].group, "Comedy");
        assert_eq!(stats[0].count, 30);
        assert_eq!(stats[0].mean, 2.0);
    }

    #[test]
    fn group_means_sorted_descending() {
        let records = vec![
            rec(1, &["A"], 5.0, 1.0),
            rec(2, &["A", "B"], 5.0, 3.0),
            rec(3, &["B"], 5.0, 5.0),
        ];
        let rows = explode(&records, CategoryField::Genre);
        let stats = group_means(&rows, Metric::RoiRatio, 1);
        assert_eq!(stats[0], GroupStat { group: "B".to_string(), count: 2, mean: 4.0 });
        assert_eq!(stats[1], GroupStat { group: "A".to_string(), count: 2, mean: 2.0 });
    }

    #[test]
    fn residuals_isolate_efficiency_from_quality() {
        // Global line roi = vote - 5 for genre "Line"; "Over" sits 1.0 above it and
        // "Under" 1.0 below, so the fit is pulled only symmetrically.
        let mut records = Vec::new();
        let mut id = 0;
        for vote in [5.0, 6.0, 7.0, 8.0] {
            id += 1;
            records.push(rec(id, &["Line"], vote, vote - 5.0));
            id += 1;
            records.push(rec(id, &["Over"], vote, vote - 4.0));
            id += 1;
            records.push(rec(id, &["Under"], vote, vote - 6.0));
        }

        let report = residuals_by_group(&records, CategoryField::Genre, Metric::VoteAverage, 4).unwrap();
        assert!((report.fit.slope - 1.0).abs() < 1e-9);
        assert!((report.fit.intercept + 5.0).abs() < 1e-9);

        let by_group: BTreeMap<&str, f64> =
            report.groups.iter().map(|g| (g.group.as_str(), g.mean)).collect();
        assert!((by_group["Over"] - 1.0).abs() < 1e-9);
        assert!(by_group["Line"].abs() < 1e-9);
        assert!((by_group["Under"] + 1.0).abs() < 1e-9);
        assert_eq!(report.groups[0].group, "Over");
    }

    #[test]
    fn residuals_need_a_fit() {
        let records = vec![rec(1, &["A"], 7.0, 1.0)];
        assert!(residuals_by_group(&records, CategoryField::Genre, Metric::VoteAverage, 1).is_none());
    }

    #[test]
    fn summaries_report_means_and_medians() {
        let records = vec![
            rec(1, &["Drama"], 6.0, 0.5),
            rec(2, &["Drama"], 8.0, 1.5),
            rec(3, &["Drama"], 7.0, 4.0),
        ];
        let rows = explode(&records, CategoryField::Genre);
        let s = &group_summaries(&rows, 3)[0];
        assert_eq!(s.count, 3);
        assert!((s.vote_mean - 7.0).abs() < 1e-9);
        assert!((s.vote_median - 7.0).abs() < 1e-9);
        assert!((s.roi_percent_mean - 200.0).abs() < 1e-9);
        assert!((s.roi_percent_median - 150.0).abs() < 1e-9);
        assert!(group_summaries(&rows, 4).is_empty());
    }

    #[test]
    fn top_values_orders_by_count_then_name() {
        let mut records = vec![rec(1, &[], 5.0, 1.0), rec(2, &[], 5.0, 1.0), rec(3, &[], 5.0, 1.0)];
        records[0].countries = vec!["KR".to_string(), "US".to_string()];
        records[1].countries = vec!["FR".to_string()];
        records[2].countries = vec![];
        let rows = explode(&records, CategoryField::Country);
        let top = top_values(&rows, 2);
        assert_eq!(
            top,
            vec![
                ValueCount { value: "FR".to_string(), count: 1 },
                ValueCount { value: "KR".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn report_serializes_with_readable_keys() {
        let records: Vec<CleanedRecord> = (0..60)
            .map(|i| rec(i, &["Action"], 5.0 + (i % 5) as f64, (i % 7) as f64 - 1.0))
            .collect();
        let report = build_report(&records, &AggregateOptions::default());
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["record_count"], 60);
        assert_eq!(v["status_counts"]["Hit"], 60);
        assert_eq!(v["genre_means"]["roi_ratio"][0]["group"], "Action");
        assert_eq!(v["genre_residuals"]["quality_metric"], "vote_average");
        assert_eq!(v["top_countries"][0]["value"], "US");
        // Every budget is identical, so there is no line to fit.
        assert!(v["budget_revenue_log_fit"].is_null());
        // A single major genre has nothing to be positioned against.
        assert_eq!(v["genre_positions"], serde_json::json!([]));
    }

    #[test]
    fn log_fit_filters_small_money_and_scores_correlation() {
        let mut records = Vec::new();
        for (i, budget) in [100_000_i64, 1_000_000, 10_000_000, 100_000_000].into_iter().enumerate() {
            let mut r = rec(i as i64, &["A"], 6.0, 1.0);
            r.budget = budget;
            r.revenue = budget * 10;
            records.push(r);
        }
        let mut tiny = rec(10, &["A"], 6.0, 1.0);
        tiny.budget = 5_000;
        tiny.revenue = 900_000_000;
        records.push(tiny);
        let mut no_revenue = rec(11, &["A"], 6.0, 1.0);
        no_revenue.revenue = 10_000;
        records.push(no_revenue);

        let fit = budget_revenue_log_fit(&records, 10_000).unwrap();
        assert_eq!(fit.n, 4);
        assert!((fit.slope - 1.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.r_value - 1.0).abs() < 1e-9);

        assert!(budget_revenue_log_fit(&records[4..], 10_000).is_none());
    }

    #[test]
    fn genre_positions_standardize_across_major_genres() {
        let mut records = Vec::new();
        let mut id = 0;
        for (genre, vote, roi) in [("Horror", 5.0, 3.0), ("Drama", 7.0, 1.0), ("Action", 6.0, 2.0)] {
            for _ in 0..3 {
                id += 1;
                records.push(rec(id, &[genre], vote, roi));
            }
        }
        id += 1;
        records.push(rec(id, &["Western"], 9.0, 9.0));

        let rows = explode(&records, CategoryField::Genre);
        let positions = genre_positions(&rows, 3);
        let by_group: BTreeMap<&str, &GenrePosition> =
            positions.iter().map(|p| (p.group.as_str(), p)).collect();

        assert_eq!(positions.len(), 3);
        assert!(!by_group.contains_key("Western"));
        // Means 1, 2, 3 across genres have sample std 1.
        assert!((by_group["Horror"].roi_z - 1.0).abs() < 1e-9);
        assert!((by_group["Horror"].vote_z + 1.0).abs() < 1e-9);
        assert!(by_group["Action"].roi_z.abs() < 1e-9);
        assert!((by_group["Drama"].roi_z + 1.0).abs() < 1e-9);
        assert!((by_group["Drama"].vote_z - 1.0).abs() < 1e-9);
        assert_eq!(by_group["Drama"].count, 3);
        assert!((by_group["Drama"].vote_mean - 7.0).abs() < 1e-9);

        assert!(genre_positions(&rows, 4).is_empty());
    }
}
