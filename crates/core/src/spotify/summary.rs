use crate::domain::track::{PopularityBucket, RankedTrack};
use crate::spotify::popularity::popularity_distribution;
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_RANKING_LIMIT: i32 = 50;
const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Frequency of each non-empty label, most frequent first (ties by label), capped at `n`.
pub fn top_labels<'a>(labels: impl IntoIterator<Item = &'a str>, n: usize) -> Vec<LabelCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        if !label.is_empty() {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    let mut out: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    out.truncate(n);
    out
}

/// Popularity buckets over tracks ranked `1..=ranking_limit`.
pub fn popularity_within(tracks: &[RankedTrack], ranking_limit: i32) -> Vec<PopularityBucket> {
    let scores: Vec<i32> = tracks
        .iter()
        .filter(|t| t.ranking <= ranking_limit)
        .filter_map(|t| t.popularity)
        .collect();
    popularity_distribution(&scores)
}

#[derive(Debug, Clone, Serialize)]
pub struct ListeningSummary {
    pub track_count: usize,
    pub top_genres: Vec<LabelCount>,
    pub top_artists: Vec<LabelCount>,
    pub popularity: Vec<PopularityBucket>,
    pub tracks: Vec<RankedTrack>,
}

pub fn listening_summary(mut tracks: Vec<RankedTrack>) -> ListeningSummary {
    tracks.sort_by_key(|t| t.ranking);
    ListeningSummary {
        track_count: tracks.len(),
        top_genres: top_labels(tracks.iter().map(|t| t.genre.as_str()), TOP_N),
        top_artists: top_labels(tracks.iter().map(|t| t.artist_name.as_str()), TOP_N),
        popularity: popularity_within(&tracks, DEFAULT_RANKING_LIMIT),
        tracks,
    }
}
